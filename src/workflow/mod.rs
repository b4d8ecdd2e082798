//! The client-side workflow core: screen sequencing, draft persistence, and
//! the document checklist. Everything in here is synchronous, I/O-free, and
//! independent of the HTTP layer; route handlers and front ends consume it.

pub mod checklist;
pub mod drafts;
pub mod session;
pub mod stepper;
