//! `serve`: the sync server.
//!
//! Runs two listeners side by side:
//! - HTTP (tiny_http + rayon pool): project files, internal scripts, components
//! - WebSocket (actor system): editor sessions and reload pushes

mod lifecycle;
mod path;
mod response;

use crate::{
    actor::Coordinator,
    core::{ServerContext, is_shutdown, register_server},
    debug, log,
};
use anyhow::{Context, Result};
use crossbeam::channel;
use std::sync::Arc;
use tiny_http::{Request, Server};

use path::Route;

/// Number of HTTP worker threads
const HTTP_WORKERS: usize = 4;

/// Start both servers and block until Ctrl+C.
pub fn serve(ctx: Arc<ServerContext>) -> Result<()> {
    let serve = &ctx.config.serve;
    let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);

    let coordinator = Coordinator::new(Arc::clone(&ctx), shutdown_rx)?;
    log!("serve"; "http://{}", addr);
    log!("serve"; "ws://{}:{}", serve.interface, coordinator.ws_port());
    if !serve.watch {
        debug!("serve"; "file watching disabled");
    }

    let actors = lifecycle::spawn_actors(coordinator);
    run_request_loop(&server, &ctx)?;
    lifecycle::wait_for_shutdown(actors);
    Ok(())
}

fn run_request_loop(server: &Server, ctx: &Arc<ServerContext>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(HTTP_WORKERS)
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &ServerContext) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    match path::route(request.url(), ctx) {
        Route::File(path) => response::respond_file(request, &path),
        Route::MissingComponent(name) => {
            debug!("serve"; "unknown component: {}", name);
            response::respond_missing_component(request, &name)
        }
        Route::NotFound => response::respond_not_found(request),
    }
}
