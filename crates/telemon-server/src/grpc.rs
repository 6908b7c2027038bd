use crate::api::apply_update;
use crate::state::AppState;
use ipnet::IpNet;
use telemon_common::metric::MetricKind;
use telemon_common::model::parse_path_change;
use telemon_common::proto::metrics_service_server::MetricsService;
use telemon_common::proto::{
    AddMetricRequest, AddMetricResponse, GetMetricRequest, GetMetricResponse, MetricKindProto,
};
use telemon_storage::error::StorageError;
use tonic::{Request, Response, Status};

pub struct MetricsServiceImpl {
    state: AppState,
    trusted_subnet: Option<IpNet>,
}

impl MetricsServiceImpl {
    pub fn new(state: AppState, trusted_subnet: Option<IpNet>) -> Self {
        Self {
            state,
            trusted_subnet,
        }
    }

    fn check_origin<T>(&self, request: &Request<T>) -> Result<(), Status> {
        let Some(subnet) = &self.trusted_subnet else {
            return Ok(());
        };
        let allowed = request
            .remote_addr()
            .map(|addr| subnet.contains(&addr.ip()))
            .unwrap_or(false);
        if allowed {
            Ok(())
        } else {
            tracing::warn!(peer = ?request.remote_addr(), "rejecting caller outside trusted subnet");
            Err(Status::permission_denied("caller is outside the trusted subnet"))
        }
    }
}

fn parse_kind(raw: i32) -> Result<MetricKind, Status> {
    match MetricKindProto::try_from(raw) {
        Ok(MetricKindProto::Counter) => Ok(MetricKind::Counter),
        Ok(MetricKindProto::Gauge) => Ok(MetricKind::Gauge),
        _ => Err(Status::invalid_argument("metric kind must be set")),
    }
}

fn storage_status(operation: &str, id: &str, err: StorageError) -> Status {
    match err {
        StorageError::NotFound { .. } => Status::not_found(err.to_string()),
        StorageError::KindMismatch { .. } => Status::invalid_argument(err.to_string()),
        other => {
            tracing::error!(operation, id, error = %other, "storage failure");
            Status::internal("storage failure")
        }
    }
}

#[tonic::async_trait]
impl MetricsService for MetricsServiceImpl {
    async fn add_metric(
        &self,
        request: Request<AddMetricRequest>,
    ) -> Result<Response<AddMetricResponse>, Status> {
        self.check_origin(&request)?;
        let req = request.into_inner();
        if req.metric_id.is_empty() {
            return Err(Status::invalid_argument("metric_id is required"));
        }

        let kind = parse_kind(req.kind)?;
        let change =
            parse_path_change(kind, &req.value).map_err(Status::invalid_argument)?;
        apply_update(&*self.state.store, kind, &req.metric_id, change)
            .map_err(|e| storage_status("update", &req.metric_id, e))?;

        tracing::debug!(id = %req.metric_id, kind = %kind, "metric ingested over rpc");
        Ok(Response::new(AddMetricResponse {}))
    }

    async fn get_metric(
        &self,
        request: Request<GetMetricRequest>,
    ) -> Result<Response<GetMetricResponse>, Status> {
        self.check_origin(&request)?;
        let req = request.into_inner();
        let kind = parse_kind(req.kind)?;

        let value = self
            .state
            .store
            .value(kind, &req.metric_id)
            .map_err(|e| storage_status("read", &req.metric_id, e))?;
        Ok(Response::new(GetMetricResponse { value }))
    }
}
