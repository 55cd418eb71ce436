use std::sync::Arc;

use crate::error::CustomError;
use crate::model::service::RouteView;
use crate::platform::PlatformService;

pub struct RoutesService {
    platform: Arc<dyn PlatformService>,
}

impl RoutesService {
    pub fn new(platform: Arc<dyn PlatformService>) -> Self {
        RoutesService { platform }
    }

    pub async fn get_route_by_name(
        &self,
        namespace: &str,
        resource_name: &str,
    ) -> Result<RouteView, CustomError> {
        let route = self
            .platform
            .get_route(namespace, resource_name)
            .await
            .map_err(CustomError::from)?
            .ok_or_else(|| CustomError::route_doesnt_exist(resource_name))?;
        Ok(RouteView { name: route.name, namespace: route.namespace, host: route.host })
    }
}
