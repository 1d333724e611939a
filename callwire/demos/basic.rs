//! Basic usage example using the callwire meta crate.
//!
//! This demonstrates:
//! 1. Awaiting a JSON body through `BodyFuture`
//! 2. Inspecting status and error body of a failed exchange through `ResponseFuture`
//! 3. Enqueueing a plain `Call` and canceling it from another task
//!
//! Requests go to an httpbin-compatible server. Set `CALLWIRE_BASE_URL` to
//! point somewhere else than https://httpbin.org.

use callwire::prelude::*;
use callwire::RequestTemplate;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Deserialize)]
struct Echo {
    url: String,
    #[serde(default)]
    args: HashMap<String, String>,
}

fn template(
    base: &str,
    path: impl Fn(&String) -> String + Send + Sync + 'static,
) -> Arc<dyn RequestTemplate<String>> {
    let base = base.to_string();
    Arc::new(FnTemplate::new(Method::GET, move |arg: &String| {
        Request::parse(Method::GET, &format!("{}{}", base, path(arg)))
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let base = std::env::var("CALLWIRE_BASE_URL")
        .unwrap_or_else(|_| "https://httpbin.org".to_string());

    let transport = ReqwestCallFactory::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let client = Client::builder(transport)
        .layer(LoggingLayer::with_prefix("[demo]"))
        .converter_factory(Arc::new(JsonConverterFactory))
        .converter_factory(Arc::new(ScalarsConverterFactory))
        .call_adapter_factory(Arc::new(FutureCallAdapterFactory))
        .finish();

    // Example 1: JSON body
    println!("=== Example 1: BodyFuture<Json<Echo>> ===\n");

    let echo = client.plan::<String, Json<Echo>, BodyFuture<Json<Echo>>>(
        &MethodDeclaration::new::<BodyFuture<Json<Echo>>>("echo"),
        template(&base, |name| format!("/get?name={name}")),
    )?;

    match echo.invoke("callwire".to_string()).await? {
        Some(Json(echo)) => println!("url: {}\nargs: {:?}\n", echo.url, echo.args),
        None => println!("(no content)\n"),
    }

    // Example 2: full response of a failed exchange
    println!("=== Example 2: ResponseFuture<String> with a non-2xx status ===\n");

    let status = client.plan::<String, String, ResponseFuture<String>>(
        &MethodDeclaration::new::<ResponseFuture<String>>("status"),
        template(&base, |code| format!("/status/{code}")),
    )?;

    let mut response = status.invoke("418".to_string()).await?;
    println!("status: {}", response.status());
    println!("successful: {}", response.is_successful());
    if let Some(body) = response.error_body_mut() {
        println!("error body:\n{}\n", body.text()?);
    }

    // Example 3: enqueue and cancel
    println!("=== Example 3: Call<String> canceled while in flight ===\n");

    let delay = client.plan::<String, String, Box<dyn Call<String>>>(
        &MethodDeclaration::new::<Box<dyn Call<String>>>("delay"),
        template(&base, |seconds| format!("/delay/{seconds}")),
    )?;

    let call = delay.invoke("10".to_string());
    let (tx, rx) = oneshot::channel();
    call.enqueue(callback(
        |response: Response<String>| println!("unexpected response: {}", response.status()),
        move |error| {
            let _ = tx.send(error);
        },
    ))?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    call.cancel();
    println!("canceled: {}", call.is_canceled());
    println!("failure: {}", rx.await?);

    Ok(())
}
