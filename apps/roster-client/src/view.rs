use tracing::warn;

use crate::{
    api::RosterBackend,
    error::ClientError,
    model::{AvatarFile, CreateEmployee, Employee, EmployeeStatus},
};

pub const LOAD_FAILED: &str = "Failed to load employees. Make sure the backend is running.";
pub const CREATE_FAILED: &str = "Failed to create employee";
pub const STATUS_FAILED: &str = "Failed to update status";
pub const UPLOAD_FAILED: &str = "Failed to upload avatar";
pub const DELETE_FAILED: &str = "Failed to delete employee";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub name: String,
    pub title: String,
    pub status: EmployeeStatus,
}

impl CreateForm {
    /// A whitespace-only name means there is nothing to submit.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Local mirror of the roster plus the transient state a front end renders.
///
/// Every failure lands in a single error slot; a newer failure replaces an
/// older one.
pub struct RosterView<B> {
    backend: B,
    employees: Vec<Employee>,
    loading: bool,
    error: Option<String>,
    form: CreateForm,
    modal_open: bool,
}

impl<B: RosterBackend> RosterView<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            employees: Vec::new(),
            loading: true,
            error: None,
            form: CreateForm::default(),
            modal_open: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn form(&self) -> &CreateForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut CreateForm {
        &mut self.form
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn open_create(&mut self) {
        self.modal_open = true;
    }

    pub fn close_create(&mut self) {
        self.modal_open = false;
    }

    /// Replaces the local list with the service's.
    pub async fn load(&mut self) -> bool {
        self.loading = true;
        self.error = None;
        let ok = match self.backend.list().await {
            Ok(employees) => {
                self.employees = employees;
                true
            }
            Err(err) => {
                warn!(error = %err, "loading employees failed");
                self.error = Some(LOAD_FAILED.to_string());
                false
            }
        };
        self.loading = false;
        ok
    }

    /// Returns whether the service accepted the new employee. A failed
    /// follow-up reload only shows up in the error slot.
    pub async fn submit_create(&mut self) -> bool {
        if self.form.is_blank() {
            return false;
        }
        let name = self.form.name.trim();
        let title = self.form.title.trim();
        let input = CreateEmployee {
            name: name.to_string(),
            title: (!title.is_empty()).then(|| title.to_string()),
            status: self.form.status,
        };
        match self.backend.create(&input).await {
            Ok(_) => {
                self.form = CreateForm::default();
                self.modal_open = false;
                self.load().await;
                true
            }
            Err(err) => {
                self.error = Some(describe(&err, CREATE_FAILED));
                false
            }
        }
    }

    pub async fn change_status(&mut self, id: i32, status: EmployeeStatus) -> bool {
        match self.backend.update_status(id, status).await {
            Ok(_) => {
                if let Some(employee) = self.employees.iter_mut().find(|e| e.id == id) {
                    employee.status = status;
                }
                true
            }
            Err(err) => {
                warn!(id, error = %err, "status update failed");
                self.error = Some(STATUS_FAILED.to_string());
                false
            }
        }
    }

    pub async fn upload_avatar(&mut self, id: i32, file: AvatarFile) -> bool {
        self.error = None;
        match self.backend.upload_avatar(id, file).await {
            Ok(updated) => {
                if let Some(employee) = self.employees.iter_mut().find(|e| e.id == id) {
                    employee.avatar_url = updated.avatar_url;
                }
                true
            }
            Err(err) => {
                self.error = Some(describe(&err, UPLOAD_FAILED));
                false
            }
        }
    }

    /// Deletes after `confirm` agrees; a declined confirmation sends nothing.
    /// Returns whether the service removed the employee.
    pub async fn delete(&mut self, id: i32, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            return false;
        }
        match self.backend.delete(id).await {
            Ok(()) => {
                self.employees.retain(|e| e.id != id);
                self.load().await;
                true
            }
            Err(err) => {
                warn!(id, error = %err, "delete failed");
                self.error = Some(DELETE_FAILED.to_string());
                false
            }
        }
    }
}

fn describe(err: &ClientError, fallback: &str) -> String {
    err.server_message().unwrap_or(fallback).to_string()
}
