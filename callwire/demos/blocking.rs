//! Blocking usage example.
//!
//! The transport runs on a runtime owned by `main`, so operations can be
//! executed synchronously from a plain thread. Async callbacks are handed to
//! a `TokioCallbackExecutor` on the same runtime.

use callwire::prelude::*;
use serde::Deserialize;
use std::sync::mpsc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Slideshow {
    slideshow: Slides,
}

#[derive(Debug, Deserialize)]
struct Slides {
    title: String,
    author: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let runtime = tokio::runtime::Runtime::new()?;
    let base = std::env::var("CALLWIRE_BASE_URL")
        .unwrap_or_else(|_| "https://httpbin.org".to_string());

    let transport = ReqwestCallFactory::builder()
        .runtime(runtime.handle().clone())
        .timeout(Duration::from_secs(30))
        .build()?;

    let client = Client::builder(transport)
        .layer(LoggingLayer::new())
        .converter_factory(Arc::new(JsonConverterFactory))
        .converter_factory(Arc::new(ScalarsConverterFactory))
        .call_adapter_factory(Arc::new(BlockingCallAdapterFactory))
        .callback_executor(Arc::new(TokioCallbackExecutor::new(runtime.handle().clone())))
        .finish();

    // Example 1: the call runs while the plan is invoked
    println!("=== Example 1: Blocking<Json<Slideshow>> ===\n");

    let json_url = format!("{base}/json");
    let slideshow = client.plan::<(), Json<Slideshow>, Blocking<Json<Slideshow>>>(
        &MethodDeclaration::new::<Blocking<Json<Slideshow>>>("slideshow"),
        Arc::new(FnTemplate::new(Method::GET, move |_: &()| {
            Request::parse(Method::GET, &json_url)
        })),
    )?;

    if let Some(Json(show)) = slideshow.invoke(()).into_body()? {
        println!("{} by {}\n", show.slideshow.title, show.slideshow.author);
    }

    // Example 2: one declaration, synchronous and asynchronous use
    println!("=== Example 2: Call<String> executed, then cloned and enqueued ===\n");

    let uuid_url = format!("{base}/uuid");
    let uuid = client.plan::<(), String, Box<dyn Call<String>>>(
        &MethodDeclaration::new::<Box<dyn Call<String>>>("uuid"),
        Arc::new(FnTemplate::new(Method::GET, move |_: &()| {
            Request::parse(Method::GET, &uuid_url)
        })),
    )?;

    let call = uuid.invoke(());
    let response = call.execute()?;
    println!("execute: {} {:?}", response.status(), response.body());

    // A second execute on the same call is refused; a clone starts fresh.
    if let Err(e) = call.execute() {
        println!("execute again: {e}");
    }

    let (tx, rx) = mpsc::channel();
    let failure_tx = tx.clone();
    call.clone_call().enqueue(callback(
        move |response: Response<String>| {
            let _ = tx.send(format!("{} {:?}", response.status(), response.body()));
        },
        move |error| {
            let _ = failure_tx.send(format!("failed: {error}"));
        },
    ))?;
    println!("enqueue: {}", rx.recv()?);

    Ok(())
}
