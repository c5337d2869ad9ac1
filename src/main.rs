use anyhow::Context;
use spindle::client::Client;
use spindle::config::Config;
use spindle::http::{Method, StatusCode, TEXT_PLAIN};
use spindle::server::{Endpoint, Httpd};
use spindle::Service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let service = Service::new(cfg.runtime.clone());
    service.start()?;

    let endpoint = Endpoint::parse(&cfg.server.listen_addr)
        .with_context(|| format!("invalid listen address {}", cfg.server.listen_addr))?;
    let self_addr = endpoint
        .socket_addr()
        .context("listen address is not a tcp address")?;

    let client = Client::new(service.clone(), &cfg.client);
    let mut httpd = Httpd::new(service.clone());

    httpd.route(Method::GET).segment("hello").to(|_req, _body, mut reply| {
        reply.content_type(TEXT_PLAIN).write("Hello, world!");
    })?;

    httpd
        .route(Method::GET)
        .path("echo/:word")
        .to(|req, _body, mut reply| {
            let word = req.param("word").unwrap_or_default();
            reply.content_type(TEXT_PLAIN).write(word);
        })?;

    // Fetches /hello from this same server on a pooled task, then answers.
    httpd
        .route(Method::GET)
        .segment("nested")
        .to(move |_req, _body, mut reply| {
            // Reported if the upstream callback never runs.
            reply.status(StatusCode::ServiceUnavailable);

            let sent = client
                .request_to(Method::GET, self_addr, "/hello")
                .and_then(|request| {
                    request.send(move |response, body| {
                        reply.status(response.status).content_type(TEXT_PLAIN);
                        reply.write("nested: ").write(body);
                    })
                });
            if let Err(e) = sent {
                tracing::error!(error = %e, "nested request not sent");
            }
        })?;

    let server = httpd.serve(&endpoint)?;
    tracing::info!(endpoint = %server.endpoint(), "serving");

    #[cfg(unix)]
    if let Some(path) = &cfg.server.local_socket {
        let local = httpd.serve(&Endpoint::local(path.clone()))?;
        tracing::info!(endpoint = %local.endpoint(), "serving");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    // stop() joins reactor threads; keep it off this runtime's workers.
    tokio::task::spawn_blocking(move || service.stop()).await?;

    Ok(())
}
