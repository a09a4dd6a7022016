//! Shared test fixtures: a scriptable in-memory portal API.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use health_portal::{
    PatientProfile, PortalApi, PortalError, ProfileView, RegisterRequest, Result, Role,
    SessionContext,
};

/// How the mock answers a call
#[derive(Clone, Debug)]
pub enum Reply {
    Ok,
    Rejected(u16, Option<&'static str>),
    Offline,
}

impl Reply {
    fn into_result(self) -> Result<()> {
        match self {
            Reply::Ok => Ok(()),
            Reply::Rejected(status, message) => Err(PortalError::Rejected {
                status,
                message: message.map(str::to_string),
            }),
            Reply::Offline => Err(PortalError::Network("connection refused".to_string())),
        }
    }
}

pub struct MockApi {
    pub profile: Mutex<PatientProfile>,
    pub fetch_reply: Mutex<Reply>,
    pub save_reply: Mutex<Reply>,
    pub register_reply: Mutex<Reply>,
    pub delay: Duration,
    pub fetch_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub saved: Mutex<Vec<PatientProfile>>,
    pub registered: Mutex<Vec<RegisterRequest>>,
}

impl MockApi {
    pub fn new(profile: PatientProfile) -> Self {
        MockApi {
            profile: Mutex::new(profile),
            fetch_reply: Mutex::new(Reply::Ok),
            save_reply: Mutex::new(Reply::Ok),
            register_reply: Mutex::new(Reply::Ok),
            delay: Duration::ZERO,
            fetch_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_fetch_reply(&self, reply: Reply) {
        *self.fetch_reply.lock().unwrap() = reply;
    }

    pub fn set_save_reply(&self, reply: Reply) {
        *self.save_reply.lock().unwrap() = reply;
    }

    pub fn set_register_reply(&self, reply: Reply) {
        *self.register_reply.lock().unwrap() = reply;
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl PortalApi for MockApi {
    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let reply = self.register_reply.lock().unwrap().clone();
        reply.into_result()?;
        self.registered.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn fetch_profile(&self, _view: ProfileView) -> Result<PatientProfile> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let reply = self.fetch_reply.lock().unwrap().clone();
        reply.into_result()?;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn update_settings(&self, profile: &PatientProfile) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let reply = self.save_reply.lock().unwrap().clone();
        reply.into_result()?;
        self.saved.lock().unwrap().push(profile.clone());
        Ok(())
    }
}

/// A profile as the settings endpoint would return it
pub fn sample_profile() -> PatientProfile {
    serde_json::from_str(
        r#"{
            "patientId": "PAT-001",
            "nic": "199012345678",
            "firstName": "Alice",
            "lastName": "Johnson",
            "email": "alice@example.com",
            "phoneNumber": "+1-555-0123",
            "address": "123 Main St",
            "dateOfBirth": "1990-01-01",
            "bloodType": "A+",
            "height": 170,
            "weight": 65,
            "guardianName": "Bob Johnson",
            "guardianRelation": "Spouse",
            "guardianContactNumber": "+1-555-0124",
            "medicationAllergies": [
                {"name": "Penicillin", "severity": "Severe"},
                {"name": "Ibuprofen", "severity": "Moderate"}
            ]
        }"#,
    )
    .unwrap()
}

/// Session with the patient role marker set
pub fn patient_session() -> Arc<SessionContext> {
    let session = SessionContext::in_memory();
    session.sign_in(Role::Patient).unwrap();
    session
}
