//! Page state machines for the booking client.
//!
//! Each page owns its local state and reconciles it with API results.
//! Network calls are split into `begin_*` / `finish_*` steps so the
//! in-flight state (submitting, deleting) can be observed; the async
//! helpers compose both steps around one client call.

use uuid::Uuid;

use super::api_client::AppointmentsClient;
use super::booking::BookingForm;
use super::saved::{SavedAppointment, SavedAppointments};
use super::ClientError;
use crate::models::Appointment;

pub const LOADING_MESSAGE: &str = "Loading...";
pub const EMPTY_LIST_MESSAGE: &str = "No appointments found. Book a new one!";
pub const RETRY_LABEL: &str = "Try Again";
pub const LIST_FETCH_FAILED: &str = "Network response was not ok";

pub const SUBMIT_LABEL: &str = "Book Appointment";
pub const SUBMITTING_LABEL: &str = "Submitting...";
pub const CREATE_FAILED: &str = "Failed to create appointment";
pub const FALLBACK_ERROR: &str = "Something went wrong";

pub const SAVE_LABEL: &str = "Save Appointment";
pub const UNSAVE_LABEL: &str = "Remove from Saved";
pub const DELETE_LABEL: &str = "Delete Appointment";
pub const DELETING_LABEL: &str = "Deleting...";
pub const DELETE_CONFIRM_PROMPT: &str =
    "Are you sure you want to delete this appointment? This action cannot be undone.";
pub const DELETE_FAILED: &str = "Failed to delete appointment. Please try again.";

pub const NO_SAVED_MESSAGE: &str =
    "You have no saved appointments yet. Book an appointment and save it.";

/// Route the create page navigates to after a successful booking.
pub const LIST_ROUTE: &str = "/";

// ── All appointments ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded(Vec<Appointment>),
    Failed(String),
}

/// What the list page shows for its current state.
#[derive(Debug, PartialEq)]
pub enum ListContent<'a> {
    Loading(&'static str),
    Empty(&'static str),
    Items(&'a [Appointment]),
    Error { message: &'a str, retry_label: &'static str },
}

#[derive(Debug)]
pub struct AllAppointmentsPage {
    state: LoadState,
}

impl Default for AllAppointmentsPage {
    fn default() -> Self {
        Self {
            state: LoadState::Loading,
        }
    }
}

impl AllAppointmentsPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Issue one list fetch and settle into `Loaded` or `Failed`.
    pub async fn load(&mut self, client: &AppointmentsClient) {
        self.state = LoadState::Loading;
        let result = client.list().await;
        self.finish_load(result);
    }

    /// Back to `Loading` and fetch again.
    pub async fn retry(&mut self, client: &AppointmentsClient) {
        self.load(client).await;
    }

    pub fn finish_load(&mut self, result: Result<Vec<Appointment>, ClientError>) {
        self.state = match result {
            Ok(appointments) => LoadState::Loaded(appointments),
            Err(ClientError::Network(message)) => {
                tracing::warn!(%message, "Error fetching appointments");
                LoadState::Failed(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching appointments");
                LoadState::Failed(LIST_FETCH_FAILED.to_string())
            }
        };
    }

    /// Drop a deleted appointment from the loaded list. No network call.
    pub fn remove_local(&mut self, id: &Uuid) {
        if let LoadState::Loaded(appointments) = &mut self.state {
            appointments.retain(|a| a.id != *id);
        }
    }

    pub fn content(&self) -> ListContent<'_> {
        match &self.state {
            LoadState::Loading => ListContent::Loading(LOADING_MESSAGE),
            LoadState::Loaded(items) if items.is_empty() => ListContent::Empty(EMPTY_LIST_MESSAGE),
            LoadState::Loaded(items) => ListContent::Items(items),
            LoadState::Failed(message) => ListContent::Error {
                message,
                retry_label: RETRY_LABEL,
            },
        }
    }
}

// ── New appointment ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Created; the page navigates to this route.
    Navigate(&'static str),
    /// Failed; the message is shown and the form stays filled in.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct NewAppointmentPage {
    pub form: BookingForm,
    submitting: bool,
    error: Option<String>,
}

impl NewAppointmentPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form controls are disabled while a submit is in flight.
    pub fn controls_disabled(&self) -> bool {
        self.submitting
    }

    pub fn button_label(&self) -> &'static str {
        if self.submitting {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_submit(&mut self) {
        self.submitting = true;
        self.error = None;
    }

    pub fn finish_submit(&mut self, result: Result<Appointment, ClientError>) -> SubmitOutcome {
        self.submitting = false;
        match result {
            Ok(created) => {
                tracing::info!(id = %created.id, "Appointment booked");
                SubmitOutcome::Navigate(LIST_ROUTE)
            }
            Err(e) => {
                let message = match e {
                    ClientError::Network(m) if !m.is_empty() => m,
                    ClientError::Network(_) => FALLBACK_ERROR.to_string(),
                    ClientError::Http { .. } | ClientError::Decode(_) => CREATE_FAILED.to_string(),
                };
                self.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Denormalize the form, POST it, and settle. An incomplete form fails
    /// without a network call.
    pub async fn submit(&mut self, client: &AppointmentsClient) -> SubmitOutcome {
        let payload = match self.form.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                let message = e.to_string();
                self.error = Some(message.clone());
                return SubmitOutcome::Failed(message);
            }
        };
        self.begin_submit();
        let result = client.create(&payload).await;
        self.finish_submit(result)
    }
}

// ── Appointment item ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Confirmation declined; nothing happened.
    Cancelled,
    /// Deleted on the server; the parent list should drop this id.
    Deleted(Uuid),
    /// Server or transport failure; the alert text is returned.
    Failed(String),
}

#[derive(Debug)]
pub struct AppointmentItem {
    appointment: Appointment,
    saved: SavedAppointments,
    deleting: bool,
}

impl AppointmentItem {
    pub fn new(appointment: Appointment, saved: SavedAppointments) -> Self {
        Self {
            appointment,
            saved,
            deleting: false,
        }
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn is_saved(&self) -> bool {
        self.saved.is_saved(&self.appointment.id)
    }

    /// Both buttons are disabled while a delete is in flight.
    pub fn buttons_disabled(&self) -> bool {
        self.deleting
    }

    pub fn save_label(&self) -> &'static str {
        if self.is_saved() {
            UNSAVE_LABEL
        } else {
            SAVE_LABEL
        }
    }

    pub fn delete_label(&self) -> &'static str {
        if self.deleting {
            DELETING_LABEL
        } else {
            DELETE_LABEL
        }
    }

    /// "Wed, Dec 25, 2024, 02:30 PM", empty when the stored value does not parse.
    pub fn formatted_date_time(&self) -> String {
        crate::format::format_date_time(&self.appointment.fields.date_time)
    }

    pub fn toggle_save(&self) {
        if self.deleting {
            return;
        }
        if self.is_saved() {
            self.saved.remove(&self.appointment.id);
        } else {
            self.saved.save(SavedAppointment::from(&self.appointment));
        }
    }

    /// Ask for confirmation and enter the deleting state. Returns `false`
    /// when declined or already deleting.
    pub fn begin_delete<C>(&mut self, confirm: C) -> bool
    where
        C: FnOnce(&str) -> bool,
    {
        if self.deleting || !confirm(DELETE_CONFIRM_PROMPT) {
            return false;
        }
        self.deleting = true;
        true
    }

    /// On success the removal cascades into the saved store.
    pub fn finish_delete(&mut self, result: Result<String, ClientError>) -> DeleteOutcome {
        self.deleting = false;
        match result {
            Ok(_) => {
                self.saved.remove(&self.appointment.id);
                DeleteOutcome::Deleted(self.appointment.id)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    id = %self.appointment.id,
                    "Error deleting appointment"
                );
                DeleteOutcome::Failed(DELETE_FAILED.to_string())
            }
        }
    }

    pub async fn delete<C>(&mut self, client: &AppointmentsClient, confirm: C) -> DeleteOutcome
    where
        C: FnOnce(&str) -> bool,
    {
        if !self.begin_delete(confirm) {
            return DeleteOutcome::Cancelled;
        }
        let result = client.delete(&self.appointment.id).await;
        self.finish_delete(result)
    }
}

// ── Saved appointments ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedContent {
    Empty(&'static str),
    Items(Vec<SavedAppointment>),
}

pub fn saved_page_content(saved: &SavedAppointments) -> SavedContent {
    let items = saved.list();
    if items.is_empty() {
        SavedContent::Empty(NO_SAVED_MESSAGE)
    } else {
        SavedContent::Items(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::{start_api_server_on, ApiServer};
    use crate::core_state::CoreState;
    use std::sync::Arc;

    async fn spawn_server() -> (ApiServer, AppointmentsClient) {
        let core = Arc::new(CoreState::in_memory().unwrap());
        let server = start_api_server_on(core, "127.0.0.1:0".parse().unwrap(), false)
            .await
            .unwrap();
        let client = AppointmentsClient::new(&server.base_url());
        (server, client)
    }

    fn unreachable_client() -> AppointmentsClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        AppointmentsClient::new(&url)
    }

    fn filled_page() -> NewAppointmentPage {
        let mut page = NewAppointmentPage::new();
        page.form.title = "Annual Checkup".into();
        page.form.description = "Routine".into();
        page.form.date_time = "2024-01-15T10:00".into();
        page
    }

    async fn book(client: &AppointmentsClient) -> Appointment {
        let payload = filled_page().form.to_payload().unwrap();
        client.create(&payload).await.unwrap()
    }

    #[tokio::test]
    async fn list_page_starts_loading_then_shows_empty_state() {
        let (_server, client) = spawn_server().await;
        let mut page = AllAppointmentsPage::new();
        assert_eq!(page.content(), ListContent::Loading(LOADING_MESSAGE));

        page.load(&client).await;
        assert_eq!(page.content(), ListContent::Empty(EMPTY_LIST_MESSAGE));
    }

    #[tokio::test]
    async fn list_page_failure_offers_retry() {
        let mut page = AllAppointmentsPage::new();
        page.load(&unreachable_client()).await;
        assert!(matches!(
            page.content(),
            ListContent::Error { retry_label: RETRY_LABEL, .. }
        ));

        let (_server, client) = spawn_server().await;
        book(&client).await;
        page.retry(&client).await;
        assert!(matches!(page.content(), ListContent::Items(items) if items.len() == 1));
    }

    #[test]
    fn list_page_http_error_uses_generic_message() {
        let mut page = AllAppointmentsPage::new();
        page.finish_load(Err(ClientError::Http {
            status: 500,
            message: "An internal error occurred".into(),
        }));
        assert_eq!(page.state(), &LoadState::Failed(LIST_FETCH_FAILED.into()));
    }

    #[tokio::test]
    async fn create_page_submits_and_navigates() {
        let (_server, client) = spawn_server().await;
        let mut page = filled_page();
        page.form.select_clinic("c3").unwrap();
        assert_eq!(page.button_label(), SUBMIT_LABEL);

        assert_eq!(page.submit(&client).await, SubmitOutcome::Navigate(LIST_ROUTE));
        assert!(!page.controls_disabled());

        let stored = client.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields.clinic_name, "Riverside Hospital");
        assert_eq!(stored[0].fields.doctor, "Dr. Emily Patel");
    }

    #[test]
    fn create_page_gates_controls_while_submitting() {
        let mut page = filled_page();
        page.begin_submit();
        assert!(page.controls_disabled());
        assert_eq!(page.button_label(), SUBMITTING_LABEL);

        let outcome = page.finish_submit(Err(ClientError::Http {
            status: 400,
            message: "Appointment validation failed".into(),
        }));
        assert_eq!(outcome, SubmitOutcome::Failed(CREATE_FAILED.into()));
        assert!(!page.controls_disabled());
        assert_eq!(page.error(), Some(CREATE_FAILED));
        assert_eq!(page.form.title, "Annual Checkup");
    }

    #[tokio::test]
    async fn create_page_surfaces_network_error_verbatim() {
        let mut page = filled_page();
        let outcome = page.submit(&unreachable_client()).await;
        let SubmitOutcome::Failed(message) = outcome else {
            panic!("expected failure");
        };
        assert!(!message.is_empty());
        assert_ne!(message, CREATE_FAILED);
        assert_eq!(page.button_label(), SUBMIT_LABEL);
    }

    #[tokio::test]
    async fn incomplete_form_fails_without_request() {
        let (_server, client) = spawn_server().await;
        let mut page = NewAppointmentPage::new();
        assert!(matches!(page.submit(&client).await, SubmitOutcome::Failed(_)));
        assert!(client.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn item_toggle_save_updates_labels() {
        let (_server, client) = spawn_server().await;
        let saved = SavedAppointments::new();
        let item = AppointmentItem::new(book(&client).await, saved.clone());

        assert_eq!(item.save_label(), SAVE_LABEL);
        item.toggle_save();
        assert_eq!(item.save_label(), UNSAVE_LABEL);
        assert_eq!(saved.count(), 1);
        item.toggle_save();
        assert_eq!(saved.count(), 0);
        assert_eq!(item.formatted_date_time(), "Mon, Jan 15, 2024, 10:00 AM");
    }

    #[tokio::test]
    async fn declined_confirmation_makes_no_call() {
        let (_server, client) = spawn_server().await;
        let mut item = AppointmentItem::new(book(&client).await, SavedAppointments::new());

        let mut prompt = String::new();
        let outcome = item
            .delete(&client, |p| {
                prompt = p.to_string();
                false
            })
            .await;
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(prompt, DELETE_CONFIRM_PROMPT);
        assert_eq!(client.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_into_saved_store_and_list() {
        let (_server, client) = spawn_server().await;
        let saved = SavedAppointments::new();
        let appointment = book(&client).await;
        let id = appointment.id;

        let mut page = AllAppointmentsPage::new();
        page.load(&client).await;

        let mut item = AppointmentItem::new(appointment, saved.clone());
        item.toggle_save();
        assert!(saved.is_saved(&id));

        let outcome = item.delete(&client, |_| true).await;
        assert_eq!(outcome, DeleteOutcome::Deleted(id));
        assert!(!saved.is_saved(&id));

        page.remove_local(&id);
        assert_eq!(page.content(), ListContent::Empty(EMPTY_LIST_MESSAGE));
        assert_eq!(saved_page_content(&saved), SavedContent::Empty(NO_SAVED_MESSAGE));
    }

    #[test]
    fn deleting_state_disables_buttons() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            fields: filled_page().form.to_payload().unwrap(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let saved = SavedAppointments::new();
        let mut item = AppointmentItem::new(appointment, saved.clone());

        assert!(item.begin_delete(|_| true));
        assert!(item.buttons_disabled());
        assert_eq!(item.delete_label(), DELETING_LABEL);
        item.toggle_save();
        assert_eq!(saved.count(), 0);

        let outcome = item.finish_delete(Err(ClientError::Http {
            status: 404,
            message: "Appointment not found".into(),
        }));
        assert_eq!(outcome, DeleteOutcome::Failed(DELETE_FAILED.into()));
        assert_eq!(item.delete_label(), DELETE_LABEL);
        assert!(!item.buttons_disabled());
    }

    #[tokio::test]
    async fn saved_page_lists_saved_entries() {
        let (_server, client) = spawn_server().await;
        let saved = SavedAppointments::new();
        let appointment = book(&client).await;
        saved.save(SavedAppointment::from(&appointment));

        let SavedContent::Items(items) = saved_page_content(&saved) else {
            panic!("expected saved items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].clinic_name, "City Medical Center");
    }
}
