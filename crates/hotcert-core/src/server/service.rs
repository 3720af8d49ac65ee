use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::service::Service as HyperService;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use log::trace;
use std::convert::Infallible;
use std::pin::Pin;

/// Answers every request on a TLS connection with the server name the client asked for.
///
/// One service is created per connection, after the handshake, so it knows which SNI selected
/// the certificate.
#[derive(Clone, Debug)]
pub struct Service {
    /// The server name sent by the client during the handshake, if any
    server_name: Option<String>,
}

impl Service {
    pub fn new(server_name: Option<String>) -> Self {
        Service { server_name }
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Plain text body describing the connection
    pub fn body(&self) -> String {
        match &self.server_name {
            Some(name) => format!("hotcert: serving `{name}`\n"),
            None => "hotcert: serving default certificate (no SNI)\n".to_string(),
        }
    }

    fn respond(&self, req: &Request<IncomingBody>) -> Response<Full<Bytes>> {
        trace!("{} {} on `{:?}`", req.method(), req.uri().path(), self.server_name);

        let mut response = Response::new(Full::new(Bytes::from(self.body())));
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

impl HyperService<Request<IncomingBody>> for Service {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<IncomingBody>) -> Self::Future {
        let response = self.respond(&req);
        Box::pin(async move { Ok(response) })
    }
}
