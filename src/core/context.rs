/// Application Context
///
/// The explicit set of shared dependencies handlers receive instead of
/// reaching into process-global state.

use std::sync::Arc;

use crate::config::Settings;
use crate::core::registry::ToolRegistry;
use crate::core::session::SessionRegistry;
use crate::provider::adapter::ProviderAdapter;
use crate::provider::poller::ResponsePoller;
use crate::think::client::ThinkClient;

pub struct AppContext {
    pub settings: Settings,
    pub sessions: SessionRegistry,
    pub tools: ToolRegistry,
    pub provider: Arc<dyn ProviderAdapter>,
    pub poller: Arc<ResponsePoller>,
    pub think_client: Option<Arc<dyn ThinkClient>>,
}
