//! Popup collaborator contract.
//!
//! Popup widgets live in the UI layer. The context only ever submits or
//! cancels the active one.

pub trait Popup: Send {
    fn handle_submit(&mut self);

    fn handle_cancel(&mut self);
}

/// A popup that does nothing on submit or cancel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPopup;

impl Popup for NoopPopup {
    fn handle_submit(&mut self) {}

    fn handle_cancel(&mut self) {}
}
