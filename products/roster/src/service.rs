use std::sync::Arc;

use entity::{EmployeeStatus, employees};
use platform_api::{ApiError, ApiResult};
use platform_db::DbPool;
use platform_files::{FileStore, StorageError};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, DbErr, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use tracing::{debug, info, instrument};

use crate::model::{AvatarUpload, CreateEmployee, Employee, UpdateStatus};

/// Owns the employee table and the avatar files that hang off it.
#[derive(Clone)]
pub struct RosterService {
    db: DbPool,
    files: Arc<dyn FileStore>,
}

impl RosterService {
    pub fn new(db: DbPool, files: Arc<dyn FileStore>) -> Self {
        Self { db, files }
    }

    /// All employees, most recently created first.
    #[instrument(name = "roster.list", skip_all)]
    pub async fn list(&self) -> ApiResult<Vec<Employee>> {
        let records = employees::Entity::find()
            .order_by_desc(employees::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(Employee::from).collect())
    }

    #[instrument(name = "roster.create", skip_all)]
    pub async fn create(&self, input: CreateEmployee) -> ApiResult<Employee> {
        let new = input.validate()?;
        let model = employees::ActiveModel {
            id: NotSet,
            name: Set(new.name),
            title: Set(new.title),
            status: Set(new.status),
            avatar_url: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(db_error)?;
        info!(employee_id = model.id, "employee created");
        Ok(model.into())
    }

    pub async fn get(&self, id: i64) -> ApiResult<Employee> {
        self.find(id).await.map(Employee::from)
    }

    #[instrument(name = "roster.update_status", skip(self, input))]
    pub async fn update_status(&self, id: i64, input: UpdateStatus) -> ApiResult<Employee> {
        let status = input.validate()?;
        let existing = self.find(id).await?;
        let mut active: employees::ActiveModel = existing.into();
        active.status = Set(status);
        let updated = active.update(&self.db).await.map_err(db_error)?;
        info!(status = status.as_str(), "employee status updated");
        Ok(updated.into())
    }

    /// Stores the new avatar, points the record at it, then drops the file it
    /// replaced. A previous file that is already gone is not an error.
    #[instrument(name = "roster.update_avatar", skip(self, upload))]
    pub async fn update_avatar(&self, id: i64, upload: AvatarUpload) -> ApiResult<Employee> {
        let avatar = upload.validate()?;
        let existing = self.find(id).await?;
        let previous = existing.avatar_url.clone();

        let reference = self
            .files
            .store(&avatar.bytes, &avatar.extension)
            .await
            .map_err(storage_error)?;

        let mut active: employees::ActiveModel = existing.into();
        active.avatar_url = Set(Some(reference.clone()));
        let updated = match active.update(&self.db).await {
            Ok(model) => model,
            Err(err) => {
                if let Err(cleanup) = self.files.delete(&reference).await {
                    debug!(error = %cleanup, "failed to remove unreferenced avatar");
                }
                return Err(db_error(err));
            }
        };

        if let Some(previous) = previous {
            let removed = self.files.delete(&previous).await.map_err(storage_error)?;
            if !removed {
                debug!(reference = %previous, "previous avatar was already gone");
            }
        }

        info!(avatar_url = %reference, "employee avatar updated");
        Ok(updated.into())
    }

    #[instrument(name = "roster.delete", skip(self))]
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let existing = self.find(id).await?;
        if let Some(avatar_url) = existing.avatar_url.as_deref() {
            let removed = self.files.delete(avatar_url).await.map_err(storage_error)?;
            if !removed {
                debug!(reference = %avatar_url, "avatar file was already gone");
            }
        }
        let result = employees::Entity::delete_by_id(existing.id)
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(not_found(id));
        }
        info!("employee deleted");
        Ok(())
    }

    /// Ids outside the key range cannot exist, so they read as not found.
    async fn find(&self, id: i64) -> ApiResult<employees::Model> {
        let Ok(key) = i32::try_from(id) else {
            return Err(not_found(id));
        };
        employees::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| not_found(id))
    }
}

/// Inserts a handful of demo employees when the table is empty. Returns the
/// number of rows written.
pub async fn seed_demo(db: &DbPool) -> Result<usize, DbErr> {
    if employees::Entity::find().count(db).await? > 0 {
        return Ok(0);
    }
    let rows = [
        ("Lora Ben Ishai", Some("Engineering Manager"), EmployeeStatus::Working),
        ("Omer Levi", Some("Backend Developer"), EmployeeStatus::LunchTime),
        ("Noa Cohen", None, EmployeeStatus::OnVacation),
        ("Daniel Katz", Some("Sales"), EmployeeStatus::BusinessTrip),
    ];
    for (name, title, status) in rows {
        employees::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            title: Set(title.map(str::to_string)),
            status: Set(status),
            avatar_url: Set(None),
        }
        .insert(db)
        .await?;
    }
    Ok(rows.len())
}

fn not_found(id: i64) -> ApiError {
    ApiError::not_found(format!("Employee {id} not found"))
}

fn db_error(err: DbErr) -> ApiError {
    ApiError::internal(anyhow::Error::new(err).context("database error"))
}

fn storage_error(err: StorageError) -> ApiError {
    ApiError::internal(anyhow::Error::new(err).context("file storage error"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use migration::{Migrator, MigratorTrait};
    use platform_files::LocalFileStore;
    use sea_orm::Database;

    use super::*;

    struct Fixture {
        service: RosterService,
        store: LocalFileStore,
        db: DbPool,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(self.store.root());
        }
    }

    async fn fixture() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let dir = std::env::temp_dir().join(format!("roster-svc-{}", uuid::Uuid::new_v4()));
        let store = LocalFileStore::new(dir);
        store.ensure_ready().await.unwrap();
        let service = RosterService::new(db.clone(), Arc::new(store.clone()));
        Fixture { service, store, db }
    }

    fn named(name: &str) -> CreateEmployee {
        CreateEmployee {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn png(len: usize) -> AvatarUpload {
        AvatarUpload {
            content_type: Some("image/png".into()),
            file_name: Some("face.png".into()),
            bytes: vec![1; len],
        }
    }

    fn path_of(fx: &Fixture, reference: &str) -> PathBuf {
        fx.store.path_for(reference).unwrap()
    }

    fn status(value: &str) -> UpdateStatus {
        UpdateStatus {
            status: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn create_defaults_status_to_working() {
        let fx = fixture().await;
        let created = fx.service.create(named("Ada Lovelace")).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.status, EmployeeStatus::Working);
        assert_eq!(created.avatar_url, None);
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_writing() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(CreateEmployee {
                name: Some("Ada".into()),
                title: None,
                status: Some("InvalidStatus".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = fx
            .service
            .create(named(&"x".repeat(101)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(fx.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let fx = fixture().await;
        let mut ids = Vec::new();
        for name in ["One", "Two", "Three"] {
            ids.push(fx.service.create(named(name)).await.unwrap().id);
        }
        let listed: Vec<i32> = fx.service.list().await.unwrap().iter().map(|e| e.id).collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn update_status_checks_value_and_existence() {
        let fx = fixture().await;
        let created = fx.service.create(named("Ada")).await.unwrap();

        let updated = fx
            .service
            .update_status(created.id.into(), status("OnVacation"))
            .await
            .unwrap();
        assert_eq!(updated.status, EmployeeStatus::OnVacation);
        assert_eq!(updated.name, "Ada");

        let err = fx
            .service
            .update_status(created.id.into(), status("Sleeping"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = fx
            .service
            .update_status(99999, status("Working"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Employee 99999 not found"));
    }

    #[tokio::test]
    async fn ids_beyond_the_key_range_are_not_found() {
        let fx = fixture().await;
        let beyond = i64::from(i32::MAX) + 1;

        let err = fx
            .service
            .update_status(beyond, status("Working"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == &format!("Employee {beyond} not found")));

        let err = fx
            .service
            .update_status(beyond, status("Sleeping"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = fx.service.delete(-1).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn replacing_an_avatar_keeps_only_the_latest_file() {
        let fx = fixture().await;
        let created = fx.service.create(named("Ada")).await.unwrap();

        let first = fx.service.update_avatar(created.id.into(), png(16)).await.unwrap();
        let first_url = first.avatar_url.clone().unwrap();
        assert!(path_of(&fx, &first_url).exists());

        let second = fx.service.update_avatar(created.id.into(), png(32)).await.unwrap();
        let second_url = second.avatar_url.clone().unwrap();
        assert_ne!(first_url, second_url);
        assert!(!path_of(&fx, &first_url).exists());
        assert!(path_of(&fx, &second_url).exists());

        let files = std::fs::read_dir(fx.store.root()).unwrap().count();
        assert_eq!(files, 1);
        assert_eq!(fx.service.get(created.id.into()).await.unwrap().avatar_url, Some(second_url));
    }

    #[tokio::test]
    async fn avatar_replacement_tolerates_missing_previous_file() {
        let fx = fixture().await;
        let created = fx.service.create(named("Ada")).await.unwrap();
        let first = fx.service.update_avatar(created.id.into(), png(4)).await.unwrap();
        std::fs::remove_file(path_of(&fx, first.avatar_url.as_deref().unwrap())).unwrap();

        let second = fx.service.update_avatar(created.id.into(), png(4)).await.unwrap();
        assert!(second.avatar_url.is_some());
    }

    #[tokio::test]
    async fn avatar_validation_and_unknown_employee() {
        let fx = fixture().await;
        let created = fx.service.create(named("Ada")).await.unwrap();

        let bad = AvatarUpload {
            content_type: Some("application/pdf".into()),
            file_name: Some("cv.pdf".into()),
            bytes: vec![1; 8],
        };
        let err = fx.service.update_avatar(created.id.into(), bad).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = fx.service.update_avatar(4242, png(8)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(std::fs::read_dir(fx.store.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn delete_removes_record_and_avatar_file() {
        let fx = fixture().await;
        let with_avatar = fx.service.create(named("Ada")).await.unwrap();
        let without_avatar = fx.service.create(named("Grace")).await.unwrap();
        let updated = fx
            .service
            .update_avatar(with_avatar.id.into(), png(8))
            .await
            .unwrap();
        let path = path_of(&fx, updated.avatar_url.as_deref().unwrap());

        fx.service.delete(with_avatar.id.into()).await.unwrap();
        assert!(!path.exists());
        fx.service.delete(without_avatar.id.into()).await.unwrap();

        assert!(fx.service.list().await.unwrap().is_empty());
        let err = fx.service.delete(with_avatar.id.into()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let fx = fixture().await;
        let first = fx.service.create(named("One")).await.unwrap();
        fx.service.delete(first.id.into()).await.unwrap();
        let second = fx.service.create(named("Two")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn seed_only_fills_an_empty_table() {
        let fx = fixture().await;
        assert_eq!(seed_demo(&fx.db).await.unwrap(), 4);
        assert_eq!(seed_demo(&fx.db).await.unwrap(), 0);
        assert_eq!(fx.service.list().await.unwrap().len(), 4);
    }
}
