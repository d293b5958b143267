//! Shared fakes and fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use find_me_app::{App, AppConfig, AppDeps};
use find_me_auth::{AuthError, AuthTransport, MemorySessionStore, SessionStore};
use find_me_capture::{CameraDevice, SyntheticCamera};
use find_me_client::{ApiTransport, ClassifyRequest, SubmitError, SubmitTrigger};
use find_me_contract::HttpReply;
use find_me_core::ImageFile;
use url::Url;

/// One recorded authenticated call.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub token: String,
    pub gallery: Vec<String>,
}

/// Scripted API transport. Replies are served in order; the last one repeats.
#[derive(Debug)]
pub struct FakeApi {
    replies: Mutex<VecDeque<HttpReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    trigger: Mutex<Option<SubmitTrigger>>,
    trigger_seen: Mutex<Vec<bool>>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new(replies: Vec<HttpReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            trigger: Mutex::new(None),
            trigger_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Self::new(vec![HttpReply::new(status, body)])
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Samples `trigger` on every multipart post.
    pub fn watch(&self, trigger: SubmitTrigger) {
        *self.trigger.lock().expect("trigger lock") = Some(trigger);
    }

    /// `is_enabled` values sampled while posts were running.
    pub fn trigger_seen(&self) -> Vec<bool> {
        self.trigger_seen.lock().expect("seen lock").clone()
    }

    fn next_reply(&self) -> HttpReply {
        let mut replies = self.replies.lock().expect("replies lock");
        if replies.len() > 1 {
            replies.pop_front().expect("reply")
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| HttpReply::new(500, "{}"))
        }
    }
}

impl ApiTransport for FakeApi {
    fn post_multipart(
        &self,
        endpoint: &Url,
        token: &str,
        request: &ClassifyRequest,
    ) -> Result<HttpReply, SubmitError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            path: endpoint.path().to_string(),
            token: token.to_string(),
            gallery: request
                .gallery_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
        if let Some(trigger) = self.trigger.lock().expect("trigger lock").as_ref() {
            self.trigger_seen
                .lock()
                .expect("seen lock")
                .push(trigger.is_enabled());
        }
        Ok(self.next_reply())
    }

    fn get(&self, endpoint: &Url, token: &str) -> Result<HttpReply, SubmitError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            path: endpoint.path().to_string(),
            token: token.to_string(),
            gallery: Vec::new(),
        });
        Ok(self.next_reply())
    }
}

/// One recorded login/signup call.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedAuth {
    pub path: String,
    pub form: Vec<(String, String)>,
    pub json: Option<serde_json::Value>,
}

/// Scripted auth transport answering every call with the same reply.
#[derive(Debug)]
pub struct FakeAuth {
    reply: HttpReply,
    calls: Mutex<Vec<RecordedAuth>>,
}

#[allow(dead_code)]
impl FakeAuth {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: HttpReply::new(status, body),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedAuth> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl AuthTransport for FakeAuth {
    fn post_form(&self, endpoint: &Url, fields: &[(&str, &str)]) -> Result<HttpReply, AuthError> {
        self.calls.lock().expect("calls lock").push(RecordedAuth {
            path: endpoint.path().to_string(),
            form: fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            json: None,
        });
        Ok(self.reply.clone())
    }

    fn post_json(&self, endpoint: &Url, body: &serde_json::Value) -> Result<HttpReply, AuthError> {
        self.calls.lock().expect("calls lock").push(RecordedAuth {
            path: endpoint.path().to_string(),
            form: Vec::new(),
            json: Some(body.clone()),
        });
        Ok(self.reply.clone())
    }
}

/// Harness bundling the app with handles to its fakes.
#[allow(dead_code)]
pub struct Harness {
    pub app: App,
    pub store: Arc<MemorySessionStore>,
    pub api: Arc<FakeApi>,
    pub auth: Arc<FakeAuth>,
    pub camera: Arc<SyntheticCamera>,
}

#[allow(dead_code)]
pub fn config() -> AppConfig {
    AppConfig {
        api_url: "http://localhost:8000".to_string(),
        session_file: "unused-session.json".into(),
        camera_enabled: true,
    }
}

/// Builds an app with optional stored token and the given fakes.
#[allow(dead_code)]
pub fn harness_with(
    token: Option<&str>,
    api: Arc<FakeApi>,
    auth: Arc<FakeAuth>,
    camera: Arc<SyntheticCamera>,
    config: AppConfig,
) -> Harness {
    let store = Arc::new(match token {
        Some(token) => MemorySessionStore::with_token(token),
        None => MemorySessionStore::new(),
    });
    let deps = AppDeps {
        session_store: store.clone() as Arc<dyn SessionStore>,
        auth_transport: auth.clone() as Arc<dyn AuthTransport>,
        api_transport: api.clone() as Arc<dyn ApiTransport>,
        camera: camera.clone() as Arc<dyn CameraDevice>,
    };
    let app = App::new(&config, deps).expect("app should build");
    Harness {
        app,
        store,
        api,
        auth,
        camera,
    }
}

/// Logged-in app whose API answers with `api`.
#[allow(dead_code)]
pub fn logged_in(api: Arc<FakeApi>) -> Harness {
    harness_with(
        Some("token-123"),
        api,
        FakeAuth::replying(200, "{}"),
        Arc::new(SyntheticCamera::default()),
        config(),
    )
}

#[allow(dead_code)]
pub fn jpeg(name: &str) -> ImageFile {
    ImageFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

/// Selects `t.jpg` and the given gallery names on the home page.
#[allow(dead_code)]
pub fn select(app: &mut App, gallery: &[&str]) {
    assert!(app.select_target(jpeg("t.jpg")));
    app.add_gallery_files(gallery.iter().map(|name| jpeg(name)).collect());
}

#[allow(dead_code)]
pub const SCENARIO_REPLY: &str = r#"{
  "matched_images": ["a.jpg"],
  "unmatched_images_with_people": ["b.jpg"],
  "images_without_people": ["c.jpg"]
}"#;
