pub mod task;

pub use task::{
    CreateTaskRequest, Task, TaskListQuery, TaskResponse, TaskStats, TaskStatus, WorkItem,
};
