use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use recon_types::{Contact, ContactId, Link, LinkPrecedence, NewContact};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContactRepository, ContactTransaction};

/// In-memory contact store with optimistic, serializable transactions.
///
/// Rows live in a `BTreeMap` behind a `RwLock`, each carrying a version that
/// is bumped on every committed change. Transactions never hold the lock
/// between calls: they record what they read (ids and versions) and stage
/// their writes. At commit the write lock is taken, every recorded read is
/// evaluated again, and any difference aborts the commit with
/// [`StoreError::Conflict`].
pub struct InMemoryContactStore {
    state: RwLock<StoreState>,
    next_id: AtomicU64,
    available: AtomicBool,
}

#[derive(Default)]
struct StoreState {
    rows: BTreeMap<ContactId, Row>,
    by_email: HashMap<String, BTreeSet<ContactId>>,
    by_phone: HashMap<String, BTreeSet<ContactId>>,
    by_link: HashMap<ContactId, BTreeSet<ContactId>>,
}

#[derive(Clone)]
struct Row {
    contact: Contact,
    version: u64,
}

/// Ids and versions observed by a read.
type Seen = Vec<(ContactId, u64)>;

impl StoreState {
    fn matching(&self, email: Option<&str>, phone: Option<&str>) -> BTreeSet<ContactId> {
        let mut ids = BTreeSet::new();
        if let Some(set) = email.and_then(|e| self.by_email.get(e)) {
            ids.extend(set.iter().copied());
        }
        if let Some(set) = phone.and_then(|p| self.by_phone.get(p)) {
            ids.extend(set.iter().copied());
        }
        ids
    }

    fn linked_to(&self, primary: ContactId) -> BTreeSet<ContactId> {
        self.by_link.get(&primary).cloned().unwrap_or_default()
    }

    fn seen(&self, ids: &BTreeSet<ContactId>) -> Seen {
        ids.iter()
            .filter_map(|id| self.rows.get(id).map(|row| (*id, row.version)))
            .collect()
    }

    fn version(&self, id: ContactId) -> Option<u64> {
        self.rows.get(&id).map(|row| row.version)
    }

    fn insert_row(&mut self, contact: Contact) {
        let id = contact.id;
        if let Some(email) = &contact.email {
            self.by_email.entry(email.clone()).or_default().insert(id);
        }
        if let Some(phone) = &contact.phone {
            self.by_phone.entry(phone.clone()).or_default().insert(id);
        }
        if let Some(primary) = contact.linked_id() {
            self.by_link.entry(primary).or_default().insert(id);
        }
        self.rows.insert(id, Row { contact, version: 1 });
    }

    fn relink(&mut self, id: ContactId, link: Link, at: DateTime<Utc>) -> StoreResult<()> {
        let row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(old) = row.contact.linked_id() {
            if let Some(set) = self.by_link.get_mut(&old) {
                set.remove(&id);
                if set.is_empty() {
                    self.by_link.remove(&old);
                }
            }
        }
        if let Some(new) = link.linked_id() {
            self.by_link.entry(new).or_default().insert(id);
        }
        row.contact.link = link;
        row.contact.updated_at = at;
        row.version += 1;
        Ok(())
    }
}

impl InMemoryContactStore {
    /// Create a new empty store. The first contact gets id 1.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Load fully-formed contacts as committed rows.
    ///
    /// Rows are taken verbatim, including their links, so data that breaks
    /// the identity invariants can be imported and later repaired. The id
    /// sequence is advanced past the largest imported id.
    pub fn import(&self, contacts: impl IntoIterator<Item = Contact>) -> StoreResult<usize> {
        let mut state = self.write_state()?;
        let mut count = 0;
        for contact in contacts {
            if state.rows.contains_key(&contact.id) {
                return Err(StoreError::DuplicateId(contact.id));
            }
            self.next_id
                .fetch_max(contact.id.get().saturating_add(1), Ordering::SeqCst);
            state.insert_row(contact);
            count += 1;
        }
        Ok(count)
    }

    /// All committed contacts, ordered by id.
    pub fn snapshot(&self) -> StoreResult<Vec<Contact>> {
        let state = self.read_state()?;
        Ok(state.rows.values().map(|row| row.contact.clone()).collect())
    }

    /// Number of committed contacts.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_state()?.rows.len())
    }

    /// Returns `true` if no contact has been committed.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Simulate the backing store going away (or coming back).
    ///
    /// While unavailable, `begin` and `commit` fail with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        }
    }

    fn allocate_id(&self) -> ContactId {
        ContactId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContactStore")
            .field("contact_count", &self.len().ok())
            .field("available", &self.is_available())
            .finish()
    }
}

impl ContactRepository for InMemoryContactStore {
    fn begin(&self, timeout: Duration) -> StoreResult<Box<dyn ContactTransaction + '_>> {
        self.ensure_available()?;
        let now = Instant::now();
        Ok(Box::new(InMemoryTransaction {
            store: self,
            timeout,
            deadline: now.checked_add(timeout).unwrap_or(now),
            reads: Vec::new(),
            updates: BTreeMap::new(),
            inserts: BTreeMap::new(),
        }))
    }
}

/// A read recorded for validation at commit time.
enum ReadRecord {
    Matching {
        email: Option<String>,
        phone: Option<String>,
        seen: Seen,
    },
    Point {
        id: ContactId,
        version: Option<u64>,
    },
    LinkedTo {
        primary: ContactId,
        seen: Seen,
    },
}

impl ReadRecord {
    /// Re-run the read against `state`; `Err` describes what changed.
    fn validate(&self, state: &StoreState) -> Result<(), String> {
        match self {
            Self::Matching { email, phone, seen } => {
                let now = state.seen(&state.matching(email.as_deref(), phone.as_deref()));
                if &now != seen {
                    return Err(format!(
                        "contacts matching email={email:?} phone={phone:?} changed"
                    ));
                }
            }
            Self::Point { id, version } => {
                if state.version(*id) != *version {
                    return Err(format!("contact {id} changed"));
                }
            }
            Self::LinkedTo { primary, seen } => {
                if &state.seen(&state.linked_to(*primary)) != seen {
                    return Err(format!("contacts linked to {primary} changed"));
                }
            }
        }
        Ok(())
    }
}

struct StagedUpdate {
    link: Link,
    base_version: u64,
}

/// A transaction on an [`InMemoryContactStore`].
pub struct InMemoryTransaction<'a> {
    store: &'a InMemoryContactStore,
    timeout: Duration,
    deadline: Instant,
    reads: Vec<ReadRecord>,
    updates: BTreeMap<ContactId, StagedUpdate>,
    inserts: BTreeMap<ContactId, Contact>,
}

impl InMemoryTransaction<'_> {
    fn check_deadline(&self) -> StoreResult<()> {
        if Instant::now() > self.deadline {
            return Err(StoreError::Timeout {
                limit: self.timeout,
            });
        }
        Ok(())
    }

    /// Apply this transaction's staged link change, if any.
    fn overlay(&self, mut contact: Contact) -> Contact {
        if let Some(update) = self.updates.get(&contact.id) {
            contact.link = update.link;
        }
        contact
    }

    fn ensure_primary_target(&mut self, id: Option<ContactId>, target: ContactId) -> StoreResult<()> {
        if id == Some(target) {
            return Err(StoreError::InvalidLink {
                id,
                target,
                reason: "a contact cannot link to itself".into(),
            });
        }
        match self.get(target)? {
            None => Err(StoreError::InvalidLink {
                id,
                target,
                reason: "target does not exist".into(),
            }),
            // Demoted since this transaction chose it; retryable.
            Some(contact) if !contact.is_primary() => Err(StoreError::PrecedenceMismatch {
                id: target,
                expected: LinkPrecedence::Primary,
                actual: contact.precedence(),
            }),
            Some(_) => Ok(()),
        }
    }
}

fn matches_pair(contact: &Contact, email: Option<&str>, phone: Option<&str>) -> bool {
    (email.is_some() && contact.email.as_deref() == email)
        || (phone.is_some() && contact.phone.as_deref() == phone)
}

impl ContactTransaction for InMemoryTransaction<'_> {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        self.check_deadline()?;
        let store = self.store;
        let state = store.read_state()?;
        let ids = state.matching(email, phone);
        let seen = state.seen(&ids);
        let mut found: Vec<Contact> = ids
            .iter()
            .filter_map(|id| state.rows.get(id))
            .map(|row| self.overlay(row.contact.clone()))
            .collect();
        drop(state);

        found.extend(
            self.inserts
                .values()
                .filter(|c| matches_pair(c, email, phone))
                .cloned(),
        );
        found.sort_by_key(|c| c.id);

        self.reads.push(ReadRecord::Matching {
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            seen,
        });
        Ok(found)
    }

    fn get(&mut self, id: ContactId) -> StoreResult<Option<Contact>> {
        self.check_deadline()?;
        if let Some(contact) = self.inserts.get(&id) {
            return Ok(Some(contact.clone()));
        }
        let store = self.store;
        let state = store.read_state()?;
        let row = state.rows.get(&id);
        self.reads.push(ReadRecord::Point {
            id,
            version: row.map(|r| r.version),
        });
        Ok(row.map(|r| self.overlay(r.contact.clone())))
    }

    fn find_linked_to(&mut self, primary: ContactId) -> StoreResult<Vec<Contact>> {
        self.check_deadline()?;
        let store = self.store;
        let state = store.read_state()?;
        let committed = state.linked_to(primary);
        let seen = state.seen(&committed);

        let mut ids = committed;
        ids.extend(
            self.updates
                .iter()
                .filter(|(_, update)| update.link.linked_id() == Some(primary))
                .map(|(id, _)| *id),
        );
        let mut found: Vec<Contact> = ids
            .iter()
            .filter_map(|id| state.rows.get(id))
            .map(|row| self.overlay(row.contact.clone()))
            .filter(|c| c.linked_id() == Some(primary))
            .collect();
        drop(state);

        found.extend(
            self.inserts
                .values()
                .filter(|c| c.linked_id() == Some(primary))
                .cloned(),
        );
        found.sort_by_key(|c| c.id);

        self.reads.push(ReadRecord::LinkedTo { primary, seen });
        Ok(found)
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        self.check_deadline()?;
        if let Some(target) = contact.link.linked_id() {
            self.ensure_primary_target(None, target)?;
        }
        let now = Utc::now();
        let contact = Contact {
            id: self.store.allocate_id(),
            email: contact.email,
            phone: contact.phone,
            link: contact.link,
            created_at: now,
            updated_at: now,
        };
        self.inserts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    fn update_link(
        &mut self,
        id: ContactId,
        link: Link,
        expected: LinkPrecedence,
    ) -> StoreResult<()> {
        self.check_deadline()?;
        if let Some(target) = link.linked_id() {
            self.ensure_primary_target(Some(id), target)?;
        }

        if let Some(pending) = self.inserts.get_mut(&id) {
            let actual = pending.precedence();
            if actual != expected {
                return Err(StoreError::PrecedenceMismatch {
                    id,
                    expected,
                    actual,
                });
            }
            pending.link = link;
            return Ok(());
        }

        let (current, base_version) = {
            let state = self.store.read_state()?;
            let row = state.rows.get(&id).ok_or(StoreError::NotFound(id))?;
            match self.updates.get(&id) {
                Some(staged) => (staged.link, staged.base_version),
                None => (row.contact.link, row.version),
            }
        };

        let actual = current.precedence();
        if actual != expected {
            return Err(StoreError::PrecedenceMismatch {
                id,
                expected,
                actual,
            });
        }
        self.updates.insert(id, StagedUpdate { link, base_version });
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check_deadline()?;
        self.store.ensure_available()?;
        let this = *self;
        let mut state = this.store.write_state()?;

        for read in &this.reads {
            read.validate(&state).map_err(StoreError::Conflict)?;
        }
        for (id, update) in &this.updates {
            if state.version(*id) != Some(update.base_version) {
                return Err(StoreError::Conflict(format!("contact {id} changed")));
            }
        }

        let now = Utc::now();
        let updated = this.updates.len();
        let inserted = this.inserts.len();
        for (id, update) in this.updates {
            state.relink(id, update.link, now)?;
        }
        for contact in this.inserts.into_values() {
            state.insert_row(contact);
        }
        debug!(updated, inserted, "contact transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn s(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn seed_primary(store: &InMemoryContactStore, email: &str, phone: &str) -> Contact {
        let mut tx = store.begin(TIMEOUT).unwrap();
        let contact = tx.insert(NewContact::primary(s(email), s(phone))).unwrap();
        tx.commit().unwrap();
        contact
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    #[test]
    fn insert_assigns_monotonic_ids() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "lorraine@hillvalley.edu", "123456");
        let b = seed_primary(&store, "biff@hillvalley.edu", "717171");
        assert_eq!(a.id, ContactId::new(1));
        assert_eq!(b.id, ContactId::new(2));
        assert!(a.created_at <= b.created_at);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn find_matches_either_field_in_id_order() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "lorraine@hillvalley.edu", "123456");
        let _ = seed_primary(&store, "biff@hillvalley.edu", "717171");
        let c = seed_primary(&store, "george@hillvalley.edu", "123456");

        let mut tx = store.begin(TIMEOUT).unwrap();
        let found = tx
            .find_by_email_or_phone(Some("lorraine@hillvalley.edu"), Some("123456"))
            .unwrap();
        let ids: Vec<_> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[test]
    fn absent_fields_match_nothing() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin(TIMEOUT).unwrap();
        tx.insert(NewContact::primary(None, s("123456"))).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin(TIMEOUT).unwrap();
        assert!(tx.find_by_email_or_phone(None, None).unwrap().is_empty());
        assert_eq!(tx.find_by_email_or_phone(None, Some("123456")).unwrap().len(), 1);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let store = InMemoryContactStore::new();
        let primary = seed_primary(&store, "doc@hillvalley.edu", "555");

        let mut tx = store.begin(TIMEOUT).unwrap();
        let added = tx
            .insert(NewContact::secondary(s("emmett@hillvalley.edu"), s("555"), primary.id))
            .unwrap();

        let found = tx.find_by_email_or_phone(None, Some("555")).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(tx.get(added.id).unwrap(), Some(added.clone()));
        assert_eq!(tx.find_linked_to(primary.id).unwrap(), vec![added]);
    }

    #[test]
    fn uncommitted_changes_are_invisible_and_dropped() {
        let store = InMemoryContactStore::new();
        {
            let mut tx = store.begin(TIMEOUT).unwrap();
            tx.insert(NewContact::primary(s("marty@hillvalley.edu"), None)).unwrap();

            let mut other = store.begin(TIMEOUT).unwrap();
            assert!(other
                .find_by_email_or_phone(Some("marty@hillvalley.edu"), None)
                .unwrap()
                .is_empty());
        }
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn update_link_moves_secondary_index() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "a@x.com", "111");
        let b = seed_primary(&store, "b@x.com", "222");

        let mut tx = store.begin(TIMEOUT).unwrap();
        tx.update_link(b.id, Link::secondary_of(a.id), LinkPrecedence::Primary)
            .unwrap();
        assert_eq!(tx.find_linked_to(a.id).unwrap().len(), 1);
        tx.commit().unwrap();

        let rows = store.snapshot().unwrap();
        assert_eq!(rows[1].link, Link::secondary_of(a.id));
        assert!(rows[1].updated_at >= rows[1].created_at);

        let mut tx = store.begin(TIMEOUT).unwrap();
        let linked = tx.find_linked_to(a.id).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, b.id);
    }

    #[test]
    fn update_link_checks_expected_precedence() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "a@x.com", "111");
        let b = seed_primary(&store, "b@x.com", "222");

        let mut tx = store.begin(TIMEOUT).unwrap();
        let err = tx
            .update_link(b.id, Link::secondary_of(a.id), LinkPrecedence::Secondary)
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::PrecedenceMismatch {
                id: b.id,
                expected: LinkPrecedence::Secondary,
                actual: LinkPrecedence::Primary,
            }
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn links_must_target_existing_primaries() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "a@x.com", "111");

        let mut tx = store.begin(TIMEOUT).unwrap();
        let err = tx
            .insert(NewContact::secondary(s("c@x.com"), None, ContactId::new(99)))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidLink { .. }));

        let err = tx
            .update_link(a.id, Link::secondary_of(a.id), LinkPrecedence::Primary)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidLink { .. }));

        let b = tx
            .insert(NewContact::secondary(s("b@x.com"), None, a.id))
            .unwrap();
        let err = tx
            .insert(NewContact::secondary(s("c@x.com"), None, b.id))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::PrecedenceMismatch {
                id: b.id,
                expected: LinkPrecedence::Primary,
                actual: LinkPrecedence::Secondary,
            }
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn target_demoted_by_concurrent_commit_is_retryable() {
        let store = InMemoryContactStore::new();
        let z = seed_primary(&store, "z@x.com", "111");
        let a = seed_primary(&store, "a@x.com", "222");

        let mut tx = store.begin(TIMEOUT).unwrap();
        assert_eq!(tx.find_by_email_or_phone(Some("a@x.com"), None).unwrap().len(), 1);

        let mut other = store.begin(TIMEOUT).unwrap();
        other
            .update_link(a.id, Link::secondary_of(z.id), LinkPrecedence::Primary)
            .unwrap();
        other.commit().unwrap();

        let err = tx
            .insert(NewContact::secondary(s("a@x.com"), s("333"), a.id))
            .unwrap_err();
        assert!(err.is_conflict(), "{err}");
        let err = tx
            .update_link(a.id, Link::secondary_of(a.id), LinkPrecedence::Primary)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidLink { .. }));
    }

    // -----------------------------------------------------------------------
    // Isolation
    // -----------------------------------------------------------------------

    #[test]
    fn stale_predicate_read_conflicts() {
        let store = InMemoryContactStore::new();

        let mut first = store.begin(TIMEOUT).unwrap();
        assert!(first
            .find_by_email_or_phone(Some("a@x.com"), None)
            .unwrap()
            .is_empty());

        let mut second = store.begin(TIMEOUT).unwrap();
        second
            .insert(NewContact::primary(s("a@x.com"), None))
            .unwrap();
        second.commit().unwrap();

        first.insert(NewContact::primary(s("a@x.com"), None)).unwrap();
        let err = first.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn concurrent_relink_conflicts() {
        let store = InMemoryContactStore::new();
        let a = seed_primary(&store, "a@x.com", "111");
        let b = seed_primary(&store, "b@x.com", "222");
        let c = seed_primary(&store, "c@x.com", "333");

        let mut first = store.begin(TIMEOUT).unwrap();
        first
            .update_link(b.id, Link::secondary_of(a.id), LinkPrecedence::Primary)
            .unwrap();

        let mut second = store.begin(TIMEOUT).unwrap();
        second
            .update_link(b.id, Link::secondary_of(c.id), LinkPrecedence::Primary)
            .unwrap();
        second.commit().unwrap();

        assert!(matches!(first.commit(), Err(StoreError::Conflict(_))));
        let rows = store.snapshot().unwrap();
        assert_eq!(rows[1].link, Link::secondary_of(c.id));
    }

    #[test]
    fn disjoint_transactions_both_commit() {
        let store = InMemoryContactStore::new();

        let mut first = store.begin(TIMEOUT).unwrap();
        first.find_by_email_or_phone(Some("a@x.com"), None).unwrap();
        first.insert(NewContact::primary(s("a@x.com"), None)).unwrap();

        let mut second = store.begin(TIMEOUT).unwrap();
        second.find_by_email_or_phone(Some("b@x.com"), None).unwrap();
        second.insert(NewContact::primary(s("b@x.com"), None)).unwrap();

        second.commit().unwrap();
        first.commit().unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    // -----------------------------------------------------------------------
    // Failure modes
    // -----------------------------------------------------------------------

    #[test]
    fn expired_transaction_times_out() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin(Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let err = tx.find_by_email_or_phone(Some("a@x.com"), None).unwrap_err();
        assert_eq!(err, StoreError::Timeout { limit: Duration::ZERO });
    }

    #[test]
    fn unavailable_store_refuses_work() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin(TIMEOUT).unwrap();
        tx.insert(NewContact::primary(s("a@x.com"), None)).unwrap();

        store.set_available(false);
        assert!(matches!(tx.commit(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.begin(TIMEOUT), Err(StoreError::Unavailable(_))));

        store.set_available(true);
        assert!(store.begin(TIMEOUT).is_ok());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let store = InMemoryContactStore::new();
        seed_primary(&store, "a@x.com", "111");
        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                let _guard = store.state.write().unwrap();
                panic!("writer died holding the lock");
            });
            assert!(writer.join().is_err());
        });

        assert!(matches!(store.len(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(store.is_empty(), Err(StoreError::LockPoisoned(_))));
        assert!(matches!(store.snapshot(), Err(StoreError::LockPoisoned(_))));
    }

    #[test]
    fn import_advances_sequence_and_rejects_duplicates() {
        let store = InMemoryContactStore::new();
        let at = Utc::now();
        let row = Contact {
            id: ContactId::new(40),
            email: s("a@x.com"),
            phone: None,
            link: Link::Primary,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(store.import(vec![row.clone()]).unwrap(), 1);
        assert_eq!(
            store.import(vec![row]).unwrap_err(),
            StoreError::DuplicateId(ContactId::new(40))
        );

        let next = seed_primary(&store, "b@x.com", "2");
        assert_eq!(next.id, ContactId::new(41));
    }
}
