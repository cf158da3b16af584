pub mod task;
pub mod user;

pub use task::{Task, TaskInput, TaskQuery, UpdateTaskInput};
pub use user::{SignupInput, UpdateUserInput, User};
