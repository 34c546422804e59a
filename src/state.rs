//! Shared application state handed to every handler.

use crate::orm::Dal;
use crate::templates::Templates;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dal: Dal,
    pub templates: Arc<Templates>,
}
