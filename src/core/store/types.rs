#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
}

/// A run request about to be recorded.
#[derive(Debug, Clone)]
pub struct NewHistory {
    pub kind: String,
    pub mode: String,
    pub inventory: String,
    pub status: String,
    pub periodic_task_id: Option<i64>,
    pub template_id: Option<i64>,
    pub template_option: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub kind: String,
    pub mode: String,
    pub inventory: String,
    pub status: String,
    pub periodic_task_id: Option<i64>,
    pub template_id: Option<i64>,
    pub template_option: Option<String>,
    pub started_at: String,
}
