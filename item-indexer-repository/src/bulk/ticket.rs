//! Per-document completion handles.

use tokio::sync::oneshot;

use crate::errors::SearchIndexError;
use crate::types::UpsertDocumentRequest;

pub(crate) type Responder = oneshot::Sender<Result<(), SearchIndexError>>;

/// A request waiting in the bulk indexer, with the channel used to report
/// its outcome.
pub(crate) struct PendingUpsert {
    pub(crate) request: UpsertDocumentRequest,
    pub(crate) responder: Responder,
}

impl PendingUpsert {
    pub(crate) fn new(request: UpsertDocumentRequest) -> (Self, IndexTicket) {
        let (responder, receiver) = oneshot::channel();
        let ticket = IndexTicket {
            document_id: request.document_id.clone(),
            receiver,
        };
        (Self { request, responder }, ticket)
    }

    /// Report the outcome to the submitter.
    ///
    /// A submitter that dropped its ticket is not interested in the outcome.
    pub(crate) fn complete(self, result: Result<(), SearchIndexError>) {
        let _ = self.responder.send(result);
    }
}

/// Handle on the outcome of a submitted document.
#[derive(Debug)]
pub struct IndexTicket {
    document_id: String,
    receiver: oneshot::Receiver<Result<(), SearchIndexError>>,
}

impl IndexTicket {
    /// Identifier of the submitted document.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Wait until the document has been written.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The bulk request containing the document succeeded for it
    /// * `Err(SearchIndexError)` - The write failed after retries, or the
    ///   indexer went away before reporting
    pub async fn wait(self) -> Result<(), SearchIndexError> {
        self.receiver.await.unwrap_or_else(|_| {
            Err(SearchIndexError::unknown(format!(
                "Bulk indexer dropped document {} without reporting",
                self.document_id
            )))
        })
    }
}
