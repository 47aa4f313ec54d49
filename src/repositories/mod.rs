pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod choices;
pub(crate) mod courses;
pub(crate) mod exams;
pub(crate) mod questions;
