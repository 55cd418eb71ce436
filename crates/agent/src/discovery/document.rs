//! On-demand retrieval of a discovered document's raw content. Bytes are
//! never cached, every read goes back to the origin URL with the
//! transport the document type calls for.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::ServiceListCache;
use crate::error::CustomError;
use crate::fetch::DiscoveryClient;
use crate::model::document::{
    ApiType, FORMAT_JSON, GRAPHQL_TYPE, OPENAPI20_TYPE, OPENAPI30_TYPE, OPENAPI31_TYPE,
};

pub struct DocumentService {
    service_cache: Arc<ServiceListCache>,
    client: Arc<DiscoveryClient>,
    get_doc_timeout: Duration,
}

impl DocumentService {
    pub fn new(service_cache: Arc<ServiceListCache>, get_doc_timeout: Duration) -> Self {
        DocumentService {
            service_cache,
            client: Arc::new(DiscoveryClient::new()),
            get_doc_timeout,
        }
    }

    pub async fn get_document_by_id(
        &self,
        namespace: &str,
        workspace_id: &str,
        service_id: &str,
        file_id: &str,
    ) -> Result<Bytes, CustomError> {
        let (services, _, _) = self.service_cache.get_services_list(namespace, workspace_id);
        let service = services.into_iter().find(|s| s.id == service_id);
        let document = service
            .as_ref()
            .and_then(|svc| svc.documents.iter().find(|d| d.file_id == file_id));

        let (service, document) = match (service.as_ref(), document) {
            (Some(service), Some(document))
                if !document.doc_path.is_empty()
                    && !document.doc_type.is_empty()
                    && !document.format.is_empty() =>
            {
                (service, document)
            }
            _ => return Err(CustomError::document_not_found(file_id)),
        };

        let spec_url = format!("{}{}", service.url, document.doc_path);

        let result = match document.doc_type.as_str() {
            OPENAPI20_TYPE | OPENAPI30_TYPE | OPENAPI31_TYPE => {
                self.client
                    .get_document(&spec_url, ApiType::Rest.as_str(), self.get_doc_timeout)
                    .await
            }
            GRAPHQL_TYPE => {
                if document.format == FORMAT_JSON {
                    self.client.post_introspection(&spec_url, self.get_doc_timeout).await
                } else {
                    self.client
                        .get_document(&spec_url, ApiType::Graphql.as_str(), self.get_doc_timeout)
                        .await
                }
            }
            other => self.client.get_document(&spec_url, other, self.get_doc_timeout).await,
        };

        result.map_err(|e| e.to_custom_error(&spec_url))
    }
}
