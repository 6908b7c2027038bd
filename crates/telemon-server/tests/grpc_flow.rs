mod common;

use common::build_test_context;
use telemon_common::proto::metrics_service_server::MetricsService;
use telemon_common::proto::{AddMetricRequest, GetMetricRequest, MetricKindProto};
use telemon_server::grpc::MetricsServiceImpl;
use tonic::{Code, Request};

fn add_request(id: &str, kind: MetricKindProto, value: &str) -> Request<AddMetricRequest> {
    Request::new(AddMetricRequest {
        metric_id: id.to_string(),
        kind: kind as i32,
        value: value.to_string(),
    })
}

fn get_request(id: &str, kind: MetricKindProto) -> Request<GetMetricRequest> {
    Request::new(GetMetricRequest {
        metric_id: id.to_string(),
        kind: kind as i32,
    })
}

#[tokio::test]
async fn counter_deltas_accumulate_over_rpc() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    for _ in 0..3 {
        service
            .add_metric(add_request("requests", MetricKindProto::Counter, "5"))
            .await
            .unwrap();
    }

    let resp = service
        .get_metric(get_request("requests", MetricKindProto::Counter))
        .await
        .unwrap();
    assert_eq!(resp.into_inner().value, "15");
}

#[tokio::test]
async fn gauge_last_write_wins_over_rpc() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    service
        .add_metric(add_request("temp", MetricKindProto::Gauge, "36.6"))
        .await
        .unwrap();
    service
        .add_metric(add_request("temp", MetricKindProto::Gauge, "37.1"))
        .await
        .unwrap();

    let resp = service
        .get_metric(get_request("temp", MetricKindProto::Gauge))
        .await
        .unwrap();
    assert_eq!(resp.into_inner().value, "37.1");
}

#[tokio::test]
async fn rpc_writes_are_visible_over_http() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    service
        .add_metric(add_request("shared", MetricKindProto::Counter, "4"))
        .await
        .unwrap();

    let (status, body) = common::get_text(&ctx.app, "/value/counter/shared").await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body, "4");
}

#[tokio::test]
async fn invalid_arguments_are_rejected() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    let status = service
        .add_metric(add_request("x", MetricKindProto::Unspecified, "1"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = service
        .add_metric(add_request("x", MetricKindProto::Counter, "1.5"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = service
        .add_metric(add_request("", MetricKindProto::Counter, "1"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn kind_mismatch_on_update_is_invalid_argument() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    service
        .add_metric(add_request("m", MetricKindProto::Counter, "1"))
        .await
        .unwrap();
    let status = service
        .add_metric(add_request("m", MetricKindProto::Gauge, "1.5"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn missing_metric_reads_as_not_found() {
    let ctx = build_test_context(None, None);
    let service = MetricsServiceImpl::new(ctx.state.clone(), None);

    let status = service
        .get_metric(get_request("ghost", MetricKindProto::Gauge))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn unknown_origin_is_denied_when_subnet_is_configured() {
    let ctx = build_test_context(None, None);
    let subnet: ipnet::IpNet = "10.0.0.0/8".parse().unwrap();
    let service = MetricsServiceImpl::new(ctx.state.clone(), Some(subnet));

    // Direct calls carry no peer address, which an origin filter must treat
    // as untrusted.
    let status = service
        .add_metric(add_request("requests", MetricKindProto::Counter, "1"))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::PermissionDenied);
}
