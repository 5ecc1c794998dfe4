#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tome_agent::{
    errors::{AppError, AppResult},
    llm::LlmBackend,
    models::domain::{GenerationParams, KnowledgeCoordinates},
    repositories::KnowledgeRepository,
};

pub const CORTES_KB: &str = "Hernán Cortés landed in 1519.";

/// Replays canned replies in order and records every prompt it receives.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<AppResult<String>>>,
    pub prompts: Mutex<Vec<(String, GenerationParams)>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<AppResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> AppResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), *params));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::fatal("no scripted reply left")))
    }
}

/// Deterministic stand-in for a model: answers depend only on the prompt.
///
/// Reasoning prompts that mention "1519" earn 4.5, anything else 2.0.
/// Formatting prompts echo the `Rating: x` line found in the rationale.
#[derive(Default)]
pub struct RubricLlm {
    pub calls: AtomicUsize,
}

#[async_trait]
impl LlmBackend for RubricLlm {
    async fn complete(&self, prompt: &str, _params: &GenerationParams) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if prompt.contains("JSON formatter") {
            let rating = prompt
                .lines()
                .find_map(|line| line.trim().strip_prefix("Rating: "))
                .unwrap_or("0");
            return Ok(format!(
                r#"{{"rating": {}, "explanation": "Extracted from rationale"}}"#,
                rating
            ));
        }

        let answer = prompt
            .split("This is the user's ANSWER:")
            .nth(1)
            .unwrap_or_default();
        let rating = if answer.contains("1519") { "4.5" } else { "2" };
        Ok(format!("1. Landing year\n2. Leader\nRating: {}", rating))
    }
}

#[derive(Default)]
pub struct InMemoryKnowledgeRepository {
    documents: HashMap<KnowledgeCoordinates, String>,
}

impl InMemoryKnowledgeRepository {
    pub fn with_document(mut self, topic: &str, section: &str, text: &str) -> Self {
        self.documents
            .insert(KnowledgeCoordinates::new(topic, section), text.to_string());
        self
    }
}

#[async_trait]
impl KnowledgeRepository for InMemoryKnowledgeRepository {
    async fn find_by_coordinates(&self, coordinates: &KnowledgeCoordinates) -> AppResult<Option<String>> {
        Ok(self.documents.get(coordinates).cloned())
    }
}

pub struct UnavailableKnowledgeRepository;

#[async_trait]
impl KnowledgeRepository for UnavailableKnowledgeRepository {
    async fn find_by_coordinates(&self, _: &KnowledgeCoordinates) -> AppResult<Option<String>> {
        Err(AppError::UpstreamUnavailable("bucket unreachable".to_string()))
    }
}

/// One-route HTTP server on a random local port. Every request gets the same
/// canned response on a fresh connection; requests are recorded verbatim.
pub struct HttpStub {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl HttpStub {
    pub async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason_phrase(status),
            body.len(),
            body
        );

        let server_hits = hits.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                server_hits.fetch_add(1, Ordering::SeqCst);
                let request = read_request(&mut socket).await;
                server_requests.lock().unwrap().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url,
            hits,
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(at) = find(&buffer, b"\r\n\r\n") {
            break at + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buffer).into_owned(),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
