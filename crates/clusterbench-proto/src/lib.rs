//! Protobuf bulk messages of the search cluster's gRPC document API.

pub mod clusterbench {
    pub mod document {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/clusterbench.document.v1.rs"));
        }
    }
}

pub use clusterbench::document::v1::*;

impl OperationContainer {
    /// Container holding an index operation without id or index overrides.
    pub fn index() -> Self {
        Self {
            operation: Some(operation_container::Operation::Index(IndexOperation::default())),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self.operation, Some(operation_container::Operation::Index(_)))
    }
}

impl Item {
    pub fn index(status: i32) -> Self {
        Self {
            item: Some(item::Item::Index(ResponseItem {
                status,
                ..Default::default()
            })),
        }
    }

    /// Result of whichever operation this item reports on.
    pub fn response(&self) -> Option<&ResponseItem> {
        match self.item.as_ref()? {
            item::Item::Index(response)
            | item::Item::Create(response)
            | item::Item::Update(response)
            | item::Item::Delete(response) => Some(response),
        }
    }

    /// Status code mirroring HTTP conventions. Items without a result report 0.
    pub fn status(&self) -> i32 {
        self.response().map_or(0, |response| response.status)
    }
}
