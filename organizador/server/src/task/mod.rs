use crate::entities::sea_orm_active_enums::Status;
use crate::entities::*;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

pub mod api;
pub mod date;

/// The state a task is in.
///
/// Serialized by variant name. On input the name is matched case-insensitively
/// and the legacy integer codes (`0`, `1`) are accepted as well.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum TaskStatus {
    #[default]
    Pendente,
    Finalizado,
}

impl TaskStatus {
    /// Looks a status up by its integer code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TaskStatus::Pendente),
            1 => Some(TaskStatus::Finalizado),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pendente => f.write_str("Pendente"),
            TaskStatus::Finalizado => f.write_str("Finalizado"),
        }
    }
}

/// Returned when a value names no known status.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status '{0}'")]
pub struct UnknownStatus(String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return TaskStatus::from_code(code).ok_or_else(|| UnknownStatus(value.to_string()));
        }
        if trimmed.eq_ignore_ascii_case("pendente") {
            Ok(TaskStatus::Pendente)
        } else if trimmed.eq_ignore_ascii_case("finalizado") {
            Ok(TaskStatus::Finalizado)
        } else {
            Err(UnknownStatus(value.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StatusVisitor;

        impl serde::de::Visitor<'_> for StatusVisitor {
            type Value = TaskStatus;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a task status name or code")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<TaskStatus, E> {
                value.parse().map_err(E::custom)
            }

            fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<TaskStatus, E> {
                TaskStatus::from_code(value)
                    .ok_or_else(|| E::custom(UnknownStatus(value.to_string())))
            }

            fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<TaskStatus, E> {
                i64::try_from(value)
                    .ok()
                    .and_then(TaskStatus::from_code)
                    .ok_or_else(|| E::custom(UnknownStatus(value.to_string())))
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

impl From<Status> for TaskStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Pendente => TaskStatus::Pendente,
            Status::Finalizado => TaskStatus::Finalizado,
        }
    }
}

impl From<TaskStatus> for Status {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pendente => Status::Pendente,
            TaskStatus::Finalizado => Status::Finalizado,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Task {
    id: i32,
    title: String,
    description: Option<String>,
    due_date: NaiveDateTime,
    status: TaskStatus,
}

impl Task {
    pub fn new(
        id: i32,
        title: String,
        description: Option<String>,
        due_date: NaiveDateTime,
        status: TaskStatus,
    ) -> Self {
        Self {
            id,
            title,
            description,
            due_date,
            status,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the due date of the task.
    pub fn due_date(&self) -> NaiveDateTime {
        self.due_date
    }

    /// Returns the status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status
    }
}

impl From<tasks::Model> for Task {
    fn from(model: tasks::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.description,
            model.due_date,
            model.status.into(),
        )
    }
}

/// The client-editable fields of a task, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// `None` means the client left the date blank.
    pub due_date: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl NewTask {
    fn validated_due_date(&self) -> Result<NaiveDateTime, TaskServiceError> {
        match self.due_date {
            Some(due_date) if !date::is_empty_date(&due_date) => Ok(due_date),
            _ => Err(TaskServiceError::EmptyDate),
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// The due date was missing or the blank-date sentinel.
    #[error("A data da tarefa não pode ser vazia")]
    EmptyDate,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Escapes the `LIKE` metacharacters in `text` so it only matches itself.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Retrieves a task by its ID.
    ///
    /// # Returns
    ///
    /// The `Task`, or `TaskServiceError::TaskNotFound` if no row has that ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        let model = self.find_model(id).await?;
        Ok(Task::from(model))
    }

    /// Retrieves every task, in ID order.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = tasks::Entity::find()
            .order_by_asc(tasks::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves the tasks whose title contains `title`.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_title(&self, title: &str) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = tasks::Entity::find()
            .filter(
                Expr::col((tasks::Entity, tasks::Column::Title))
                    .like(LikeExpr::new(format!("%{}%", escape_like(title))).escape('\\')),
            )
            .order_by_asc(tasks::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves the tasks due on `day`, whatever their time of day.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_date(&self, day: NaiveDate) -> Result<Vec<Task>, TaskServiceError> {
        let start = day.and_time(NaiveTime::MIN);
        let mut query = tasks::Entity::find().filter(tasks::Column::DueDate.gte(start));
        // `succ_opt` is only `None` on the last representable day.
        if let Some(next_day) = day.succ_opt() {
            query = query.filter(tasks::Column::DueDate.lt(next_day.and_time(NaiveTime::MIN)));
        }

        let tasks = query
            .order_by_asc(tasks::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves the tasks with exactly the given status.
    #[tracing::instrument(skip(self))]
    pub async fn get_tasks_by_status(
        &self,
        status: TaskStatus,
    ) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = tasks::Entity::find()
            .filter(tasks::Column::Status.eq(Status::from(status)))
            .order_by_asc(tasks::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Creates a new task in the database.
    ///
    /// # Arguments
    ///
    /// * `new_task` - The fields of the task. The due date must be present and not blank.
    ///
    /// # Returns
    ///
    /// The created `Task` with its assigned ID, or `TaskServiceError::EmptyDate`.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, new_task: NewTask) -> Result<Task, TaskServiceError> {
        let due_date = new_task.validated_due_date()?;

        let active_model = tasks::ActiveModel {
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(new_task.description),
            due_date: ActiveValue::Set(due_date),
            status: ActiveValue::Set(new_task.status.into()),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        tracing::info!("Created task {}", created_model.id);
        Ok(Task::from(created_model))
    }

    /// Overwrites the editable fields of a task. The ID never changes.
    ///
    /// The row is looked up first, so an unknown ID is reported as not found
    /// even when the payload is also invalid.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update.
    /// * `changes` - The new title, description, due date and status.
    #[tracing::instrument(skip(self))]
    pub async fn update_task_by_id(
        &self,
        id: i32,
        changes: NewTask,
    ) -> Result<Task, TaskServiceError> {
        let task_to_update = self.find_model(id).await?;
        let due_date = changes.validated_due_date()?;

        let mut active_model: tasks::ActiveModel = task_to_update.into();
        active_model.title = ActiveValue::Set(changes.title);
        active_model.description = ActiveValue::Set(changes.description);
        active_model.due_date = ActiveValue::Set(due_date);
        active_model.status = ActiveValue::Set(changes.status.into());
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Deletes a task by its ID.
    ///
    /// # Returns
    ///
    /// The deleted `Task`, or `TaskServiceError::TaskNotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        let task_to_delete = self.find_model(id).await?;

        tasks::Entity::delete_by_id(task_to_delete.id)
            .exec(self.db)
            .await?;
        tracing::info!("Deleted task {}", id);
        Ok(Task::from(task_to_delete))
    }

    async fn find_model(&self, id: i32) -> Result<tasks::Model, TaskServiceError> {
        tasks::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_status_names_and_codes() {
        assert_eq!("Pendente".parse(), Ok(TaskStatus::Pendente));
        assert_eq!("finalizado".parse(), Ok(TaskStatus::Finalizado));
        assert_eq!("0".parse(), Ok(TaskStatus::Pendente));
        assert_eq!(" 1 ".parse(), Ok(TaskStatus::Finalizado));
        assert_eq!(
            "2".parse::<TaskStatus>(),
            Err(UnknownStatus("2".to_string()))
        );
        assert_eq!(
            "Cancelado".parse::<TaskStatus>(),
            Err(UnknownStatus("Cancelado".to_string()))
        );
    }

    #[test]
    fn can_deserialize_status_from_json() {
        assert_eq!(
            serde_json::from_str::<TaskStatus>(r#""Finalizado""#).unwrap(),
            TaskStatus::Finalizado
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("1").unwrap(),
            TaskStatus::Finalizado
        );
        assert!(serde_json::from_str::<TaskStatus>("-1").is_err());
        assert!(serde_json::from_str::<TaskStatus>("7").is_err());
    }

    #[test]
    fn serializes_status_by_name() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Pendente).unwrap(),
            r#""Pendente""#
        );
        assert_eq!(TaskStatus::Finalizado.to_string(), "Finalizado");
    }

    #[test]
    fn status_codes_match_storage() {
        assert_eq!(TaskStatus::from_code(0), Some(TaskStatus::Pendente));
        assert_eq!(TaskStatus::from_code(1), Some(TaskStatus::Finalizado));
        assert_eq!(TaskStatus::from(Status::Finalizado), TaskStatus::Finalizado);
        assert_eq!(Status::from(TaskStatus::Pendente), Status::Pendente);
    }

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("pão"), "pão");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_c"), "a\\_c");
        assert_eq!(escape_like(r"C:\tmp"), r"C:\\tmp");
    }

    #[test]
    fn rejects_blank_due_dates() {
        let missing = NewTask::default();
        assert!(matches!(
            missing.validated_due_date(),
            Err(TaskServiceError::EmptyDate)
        ));

        let sentinel = NewTask {
            due_date: Some(date::empty_date()),
            ..Default::default()
        };
        assert!(matches!(
            sentinel.validated_due_date(),
            Err(TaskServiceError::EmptyDate)
        ));

        let due = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_time(NaiveTime::MIN);
        let valid = NewTask {
            due_date: Some(due),
            ..Default::default()
        };
        assert_eq!(valid.validated_due_date().unwrap(), due);
    }

    #[tokio::test]
    async fn validates_before_touching_the_database() {
        let db = DatabaseConnection::Disconnected;
        let service = TaskService::new(&db);

        let result = service.create_task(NewTask::default()).await;

        assert!(matches!(result, Err(TaskServiceError::EmptyDate)));
    }

    #[tokio::test]
    async fn reports_storage_failures_as_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();
        let service = TaskService::new(&db);

        let result = service.get_all_tasks().await;

        assert!(matches!(result, Err(TaskServiceError::Database(_))));
    }
}
