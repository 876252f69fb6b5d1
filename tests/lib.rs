//! Shared fixtures for the stockflow behaviour tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub use stockflow_core::{
    BoxFuture, HttpClient, HttpError, HttpRequest, HttpResponse, Product, ProductId,
};

/// Fake transport that replays a script, then repeats a fallback reply.
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    fallback: Result<HttpResponse, HttpError>,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn always(reply: Result<HttpResponse, HttpError>) -> Self {
        Self::sequence(Vec::new(), reply)
    }

    pub fn sequence(
        script: Vec<Result<HttpResponse, HttpError>>,
        fallback: Result<HttpResponse, HttpError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every reply is held back by `delay` on the tokio clock.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
        self.requests.lock().expect("requests lock").push(request);
        let reply = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }
}

pub fn stock_reply(body: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::ok_json(body))
}

pub fn status_reply(status: u16) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(status, ""))
}

pub fn product(id: ProductId, stock: u32) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        description: String::new(),
        price: 10.0,
        stock,
        category_id: 1,
    }
}
