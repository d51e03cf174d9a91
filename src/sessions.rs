//! Per-draft session state.
//!
//! Each open prescription draft owns its items, allergies, override ledger
//! and audit trail behind its own `Mutex`. The registry map is only
//! write-locked to open or close a session, so edits to different drafts
//! never contend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Allergy, PrescriptionItem, PrescriptionItemUpdate};
use crate::safety::audit::{AuditTrail, PurgeCause};
use crate::safety::{
    FindingId, OverrideLedger, OverrideRecord, SafetyEngine, SafetyReport, ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),
    #[error("Prescription item not found: {0}")]
    ItemNotFound(Uuid),
    #[error("Prescription item already in draft: {0}")]
    DuplicateItem(Uuid),
    #[error("Internal lock error")]
    LockPoisoned,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ═══════════════════════════════════════════════════════════
// DraftSession
// ═══════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct DraftSession {
    pub id: Uuid,
    pub patient_id: String,
    /// Actor recorded on every override made in this draft.
    pub clinician_id: String,
    pub opened_at: DateTime<Utc>,
    items: Vec<PrescriptionItem>,
    allergies: Vec<Allergy>,
    ledger: OverrideLedger,
    audit: AuditTrail,
}

impl DraftSession {
    pub fn new(
        patient_id: &str,
        clinician_id: &str,
        allergies: Vec<Allergy>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.trim().to_string(),
            clinician_id: clinician_id.trim().to_string(),
            opened_at,
            items: Vec::new(),
            allergies,
            ledger: OverrideLedger::new(),
            audit: AuditTrail::new(),
        }
    }

    pub fn items(&self) -> &[PrescriptionItem] {
        &self.items
    }

    pub fn allergies(&self) -> &[Allergy] {
        &self.allergies
    }

    pub fn ledger(&self) -> &OverrideLedger {
        &self.ledger
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    // ── Draft edits ─────────────────────────────────────────

    pub fn add_item(
        &mut self,
        item: PrescriptionItem,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        if self.items.iter().any(|i| i.id == item.id) {
            return Err(SessionError::DuplicateItem(item.id));
        }
        self.items.push(item);
        self.purge_stale_items(at);
        Ok(())
    }

    pub fn update_item(
        &mut self,
        item_id: Uuid,
        update: PrescriptionItemUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(SessionError::ItemNotFound(item_id))?;
        item.apply(update);
        self.purge_stale_items(at);
        Ok(())
    }

    /// Remove an item and drop every override that referenced it.
    /// Returns the purged overrides.
    pub fn remove_item(
        &mut self,
        item_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<OverrideRecord>, SessionError> {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() == before {
            return Err(SessionError::ItemNotFound(item_id));
        }
        Ok(self.purge_stale_items(at))
    }

    /// Replace the allergy list. Overrides of allergy findings whose allergen
    /// is no longer listed are purged.
    pub fn set_allergies(
        &mut self,
        allergies: Vec<Allergy>,
        engine: &dyn SafetyEngine,
        at: DateTime<Utc>,
    ) -> Vec<OverrideRecord> {
        let kb = engine.knowledge_base();
        let keys: HashSet<String> = allergies
            .iter()
            .map(|a| kb.canonicalize(&a.allergen))
            .collect();
        self.allergies = allergies;

        let purged = self.ledger.purge_stale_allergens(&keys);
        for record in &purged {
            self.audit
                .purged(at, &self.clinician_id, record, PurgeCause::AllergyRemoved);
        }
        purged
    }

    fn purge_stale_items(&mut self, at: DateTime<Utc>) -> Vec<OverrideRecord> {
        let current: HashSet<Uuid> = self.items.iter().map(|i| i.id).collect();
        let purged = self.ledger.purge_stale(&current);
        for record in &purged {
            self.audit
                .purged(at, &self.clinician_id, record, PurgeCause::ItemRemoved);
        }
        purged
    }

    // ── Review ──────────────────────────────────────────────

    pub fn report(&self, engine: &dyn SafetyEngine) -> SafetyReport {
        engine.review(&self.items, &self.allergies, &self.ledger)
    }

    /// Override a currently detected finding on behalf of the session's
    /// clinician. Accepted and rejected attempts both land in the audit trail.
    pub fn override_finding(
        &mut self,
        engine: &dyn SafetyEngine,
        finding_id: &str,
        reason_code: &str,
        custom_text: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<OverrideRecord, SessionError> {
        let result = self.try_override(engine, finding_id, reason_code, custom_text, at);
        match &result {
            Ok(record) => self.audit.recorded(record),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    error = e.code(),
                    "Override rejected"
                );
                self.audit.rejected(
                    at,
                    &self.clinician_id,
                    finding_id,
                    reason_code,
                    &e.to_string(),
                );
            }
        }
        result.map_err(SessionError::from)
    }

    fn try_override(
        &mut self,
        engine: &dyn SafetyEngine,
        finding_id: &str,
        reason_code: &str,
        custom_text: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<OverrideRecord, ValidationError> {
        let id: FindingId = finding_id.parse()?;
        let detected = engine
            .check(&self.items, &self.allergies)
            .findings
            .iter()
            .any(|f| f.id == id);
        if !detected {
            return Err(ValidationError::UnknownFinding(id.to_string()));
        }
        self.ledger
            .record_override(&id, reason_code, custom_text, &self.clinician_id, at)
            .cloned()
    }
}

// ═══════════════════════════════════════════════════════════
// SessionRegistry
// ═══════════════════════════════════════════════════════════

/// Open drafts keyed by session id, sharing one engine.
pub struct SessionRegistry {
    engine: Arc<dyn SafetyEngine>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<DraftSession>>>>,
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn SafetyEngine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &dyn SafetyEngine {
        self.engine.as_ref()
    }

    /// Open a draft. The clinician id is required: it is the override actor.
    pub fn open(
        &self,
        patient_id: &str,
        clinician_id: &str,
        allergies: Vec<Allergy>,
        at: DateTime<Utc>,
    ) -> Result<Uuid, SessionError> {
        if clinician_id.trim().is_empty() {
            return Err(ValidationError::MissingActor.into());
        }
        let session = DraftSession::new(patient_id, clinician_id, allergies, at);
        let id = session.id;

        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        sessions.insert(id, Arc::new(Mutex::new(session)));

        tracing::info!(session_id = %id, open = sessions.len(), "Draft session opened");
        Ok(id)
    }

    pub fn close(&self, id: Uuid) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        sessions.remove(&id).ok_or(SessionError::NotFound(id))?;
        tracing::info!(session_id = %id, open = sessions.len(), "Draft session closed");
        Ok(())
    }

    /// Run `f` with exclusive access to one session. Other sessions stay
    /// available while `f` runs.
    pub fn with_session<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut DraftSession, &dyn SafetyEngine) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let session = {
            let sessions = self
                .sessions
                .read()
                .map_err(|_| SessionError::LockPoisoned)?;
            sessions.get(&id).cloned().ok_or(SessionError::NotFound(id))?
        };
        let mut guard = session.lock().map_err(|_| SessionError::LockPoisoned)?;
        f(&mut guard, self.engine.as_ref())
    }

    pub fn session_count(&self) -> Result<usize, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        Ok(sessions.len())
    }
}
