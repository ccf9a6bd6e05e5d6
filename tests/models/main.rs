//! Model orchestration integration tests.

mod construction;
mod lifecycle;
