//! Messaging client methods

use super::{ApiClient, ClientError};
use medport_core::{Message, NewMessage};

impl ApiClient {
    /// Messages the caller sent or received
    pub async fn messages(&self) -> Result<Vec<Message>, ClientError> {
        self.get("/messages/").await
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message, ClientError> {
        self.post("/messages/", message).await
    }
}
