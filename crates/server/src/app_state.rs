use std::sync::Arc;

use crate::model::Assets;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) assets: Arc<Assets>,
}
