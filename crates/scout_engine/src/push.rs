use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use scout_core::SessionId;
use scout_logging::scout_debug;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::config::push_url;
use crate::TransportError;

/// Text frames of one push subscription. The stream ends when the server
/// closes the connection.
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    async fn subscribe(&self, session_id: &SessionId) -> Result<FrameStream, TransportError>;
}

/// WebSocket subscription to `<base>/api/ws/portfolio-scraping/<session id>`.
#[derive(Debug, Clone)]
pub struct WsPushTransport {
    base_url: String,
}

impl WsPushTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, session_id: &SessionId) -> String {
        push_url(&self.base_url, session_id)
    }
}

#[async_trait::async_trait]
impl PushTransport for WsPushTransport {
    async fn subscribe(&self, session_id: &SessionId) -> Result<FrameStream, TransportError> {
        let url = self.url_for(session_id);
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|err| TransportError::Connect {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        scout_debug!(session = session_id; "connected to {}", url);

        let frames = socket.filter_map(|message| async move {
            match message {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                // Ping/pong are answered by tungstenite; close ends the stream.
                Ok(_) => None,
                Err(err) => Some(Err(TransportError::Stream(err.to_string()))),
            }
        });
        Ok(frames.boxed())
    }
}
