mod common;

// std
use std::sync::{Arc, atomic::Ordering};
// self
use common::{CHALLENGE_DATA, DIRECTORY_SERVER_DATA, ScriptedGateway, ScriptedThreeDs, Step, url};
use payment_action_broker::{
	action::CustomerAction,
	cancel::CancellationToken,
	codec::{self, CHALLENGE_ACCEPTED_TOKEN, CHALLENGE_REJECTED_TOKEN},
	config::BrokerConfig,
	error::{FailureCode, FailureScope},
	flows::PaymentBroker,
	gateway::InvoiceAuthorizationRequest,
};

fn broker(gateway: ScriptedGateway) -> (PaymentBroker<ScriptedGateway>, Arc<ScriptedGateway>) {
	let gateway = Arc::new(gateway);

	(PaymentBroker::new(gateway.clone()), gateway)
}

fn request() -> InvoiceAuthorizationRequest {
	InvoiceAuthorizationRequest::new("iv_test", "card_test")
}

#[tokio::test]
async fn no_action_finishes_after_one_call() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([Step::Reply(None)]));
	let delegate = ScriptedThreeDs::new();

	broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect("Authorization without customer actions should succeed.");

	assert_eq!(gateway.authorization_sources(), vec!["card_test"]);
	assert!(delegate.calls().is_empty());
	assert_eq!(delegate.clean_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.authorization_metrics.successes(), 1);
}

#[tokio::test]
async fn challenge_outcome_is_resubmitted_as_literal_token() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([
		Step::Reply(Some(CustomerAction::ChallengeMobile(CHALLENGE_DATA.into()))),
		Step::Reply(None),
	]));
	let delegate = ScriptedThreeDs::new();

	broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect("Authorization with a passed challenge should succeed.");

	assert_eq!(gateway.authorization_sources(), vec!["card_test", CHALLENGE_ACCEPTED_TOKEN]);
	assert_eq!(delegate.calls(), vec!["challenge"]);
}

#[tokio::test]
async fn failed_challenge_still_resubmits() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([
		Step::Reply(Some(CustomerAction::ChallengeMobile(CHALLENGE_DATA.into()))),
		Step::Reply(None),
	]));
	let delegate = ScriptedThreeDs { challenge_passed: false, ..ScriptedThreeDs::new() };

	broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect("The gateway decides what a failed challenge means.");

	assert_eq!(gateway.authorization_sources()[1], CHALLENGE_REJECTED_TOKEN);
}

#[tokio::test]
async fn chained_actions_resolve_in_order() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([
		Step::Reply(Some(CustomerAction::FingerprintMobile(DIRECTORY_SERVER_DATA.into()))),
		Step::Reply(Some(CustomerAction::ChallengeMobile(CHALLENGE_DATA.into()))),
		Step::Reply(Some(CustomerAction::Redirect(url("https://example.com/redirect").into()))),
		Step::Reply(None),
	]));
	let delegate = ScriptedThreeDs::new().with_redirect_token("tok_redirected");

	broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect("Chained customer actions should resolve.");

	let sources = gateway.authorization_sources();
	let fingerprint =
		codec::decode_token(&sources[1]).expect("Fingerprint token should decode.");

	assert_eq!(sources.len(), 4);
	assert!(fingerprint.body.contains("\"sdkTransID\":\"4\""));
	assert_eq!(sources[2], CHALLENGE_ACCEPTED_TOKEN);
	assert_eq!(sources[3], "tok_redirected");
	assert_eq!(delegate.calls(), vec!["fingerprint", "challenge", "redirect"]);
	assert_eq!(broker.resolver.metrics().successes(), 3);
}

#[tokio::test]
async fn gateway_failure_is_returned_unchanged() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([Step::Fail(
		FailureCode::from_gateway("card.declined"),
	)]));
	let delegate = ScriptedThreeDs::new();
	let err = broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect_err("Gateway failures should end the loop.");

	assert_eq!(err.code, FailureCode::from_gateway("card.declined"));
	assert_eq!(gateway.authorization_sources().len(), 1);
	assert_eq!(delegate.clean_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.authorization_metrics.failures(), 1);
}

#[tokio::test]
async fn resolution_failure_stops_before_resubmitting() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([Step::Reply(Some(
		CustomerAction::ChallengeMobile("!!not-base64!!".into()),
	))]));
	let delegate = ScriptedThreeDs::new();
	let err = broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect_err("Undecodable challenge data should fail.");

	assert_eq!(err.code, FailureCode::Internal(FailureScope::Mobile));
	assert_eq!(gateway.authorization_sources().len(), 1);
}

#[tokio::test]
async fn sdk_version_defaults_from_delegate() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([Step::Reply(None)]));
	let delegate = ScriptedThreeDs::new().with_version("2.2.0");

	broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect("Authorization should succeed.");

	let explicit = request().with_third_party_sdk_version("9.9.9");

	broker
		.authorize_invoice(explicit, &delegate, &CancellationToken::new())
		.await
		.expect("Authorization should succeed.");

	let requests = gateway.authorization_requests.lock();

	assert_eq!(requests[0].third_party_sdk_version.as_deref(), Some("2.2.0"));
	assert_eq!(requests[1].third_party_sdk_version.as_deref(), Some("9.9.9"));
}

#[tokio::test]
async fn iteration_cap_stops_endless_action_chains() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([Step::Reply(Some(
		CustomerAction::ChallengeMobile(CHALLENGE_DATA.into()),
	))]));
	let broker = broker.with_config(BrokerConfig::default().with_max_authorization_iterations(2));
	let delegate = ScriptedThreeDs::new();
	let err = broker
		.authorize_invoice(request(), &delegate, &CancellationToken::new())
		.await
		.expect_err("Endless customer actions should hit the cap.");

	assert_eq!(err.code, FailureCode::generic_mobile());
	assert_eq!(gateway.authorization_sources().len(), 3);
	assert_eq!(delegate.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_redirect_ends_the_loop() {
	let (broker, gateway) = broker(ScriptedGateway::authorizing([
		Step::Reply(Some(CustomerAction::Redirect(url("https://example.com/redirect").into()))),
		Step::Reply(None),
	]));
	let delegate = ScriptedThreeDs::new();
	let cancel = CancellationToken::new();
	let canceller = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(std::time::Duration::from_secs(30)).await;
		canceller.cancel();
	});

	let err = broker
		.authorize_invoice(request(), &delegate, &cancel)
		.await
		.expect_err("Cancelled authorization should fail.");

	assert_eq!(err.code, FailureCode::Cancelled);
	assert_eq!(gateway.authorization_sources().len(), 1);
	assert_eq!(delegate.clean_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.authorization_metrics.cancellations(), 1);
}

#[tokio::test]
async fn already_cancelled_token_skips_the_gateway() {
	let (broker, gateway) = broker(ScriptedGateway::default());
	let cancel = CancellationToken::new();

	cancel.cancel();

	let err = broker
		.authorize_invoice(request(), &ScriptedThreeDs::new(), &cancel)
		.await
		.expect_err("Cancelled authorization should fail.");

	assert!(err.is_cancelled());
	assert!(gateway.authorization_sources().is_empty());
}
