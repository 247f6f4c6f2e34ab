//! HTTP server.
//!
//! Listens for requests and maps them to a handler by path prefix.
//! If no handler matches, returns `404 - Not Found`.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::select;
use tokio::signal::ctrl_c;
use tracing::{debug, error, info};

use super::{Error, Handler, Request, Response, Router};
use crate::colors::MaybeColorize;

/// HTTP server, not yet listening.
pub struct Server {
    router: Arc<Router>,
    name: String,
}

impl Server {
    /// Create a server for these routes.
    pub fn new(handlers: Vec<Handler>) -> Self {
        Server {
            router: Arc::new(Router::new(handlers)),
            name: "HTTP".into(),
        }
    }

    /// Name shown in the startup log line.
    pub fn name(mut self, name: impl ToString) -> Self {
        self.name = name.to_string();
        self
    }

    /// Start listening. Use port 0 to let the OS pick one.
    pub async fn bind(self, addr: impl ToSocketAddrs) -> Result<BoundServer, Error> {
        let listener = TcpListener::bind(addr).await?;

        Ok(BoundServer {
            router: self.router,
            name: self.name,
            listener,
        })
    }
}

/// HTTP server with a listening socket.
pub struct BoundServer {
    router: Arc<Router>,
    name: String,
    listener: TcpListener,
}

impl BoundServer {
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C.
    pub async fn launch(self) -> Result<(), Error> {
        select! {
            _ = ctrl_c() => {
                info!("Shutting down...");
                Ok(())
            }

            result = self.serve() => result,
        }
    }

    /// Accept connections forever.
    pub async fn serve(self) -> Result<(), Error> {
        info!(
            "Starting {} {}",
            self.name.green(),
            "server".purple()
        );
        self.router.log_routes();
        info!("Listening on {}", self.listener.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let router = self.router.clone();

                    tokio::spawn(async move {
                        Self::handle_connection(router, stream, peer_addr).await;
                    });
                }

                Err(err) => {
                    error!("accept error: {}", err);
                }
            }
        }
    }

    async fn handle_connection(router: Arc<Router>, stream: TcpStream, peer_addr: SocketAddr) {
        let mut stream = BufReader::new(BufWriter::new(stream));
        debug!("{} new connection from {:?}", "http".purple(), peer_addr);

        loop {
            let request = match Request::read(&mut stream).await {
                Ok(request) => request,
                Err(err) => {
                    if let Error::MalformedRequest(_) = err {
                        let _ = Self::send_response(&mut stream, Response::bad_request()).await;
                    }

                    debug!(
                        "{} client {:?} disconnected: {}",
                        "http".purple(),
                        peer_addr,
                        err
                    );
                    return;
                }
            };

            let start = Instant::now();

            let (response, controller_name) = match router.find(request.path()) {
                Some(handler) => {
                    let response = match handler.handle(&request).await {
                        Ok(response) => response,
                        Err(err) => {
                            error!("{}", err);

                            match err.code() {
                                400 => Response::bad_request(),
                                _ => Response::internal_error(err),
                            }
                        }
                    };

                    (response, handler.controller_name())
                }

                None => (Response::not_found(), std::any::type_name::<Self>()),
            };

            let keep_alive = request.keep_alive();
            let response = if keep_alive {
                response
            } else {
                response.header("connection", "close")
            };

            Self::log(&request, controller_name, &response, start.elapsed());

            if let Err(err) = Self::send_response(&mut stream, response).await {
                debug!("{} error {:?}", peer_addr, err);
                break;
            }

            if !keep_alive {
                break;
            }
        }
    }

    fn log(request: &Request, controller_name: &str, response: &Response, duration: Duration) {
        let method = request.method().to_string();
        let path = request.path();
        let code = response.status().code();
        let duration = (duration.as_secs_f64() * 1000.0) as f32;

        info!(
            "{} {} {} {} ({:.3} ms)",
            method.purple(),
            path.purple(),
            controller_name.green(),
            code,
            duration,
        );
    }

    async fn send_response(
        mut stream: impl AsyncWrite + Unpin,
        response: Response,
    ) -> Result<(), Error> {
        response.send(&mut stream).await?;
        stream.flush().await?;

        Ok(())
    }
}
