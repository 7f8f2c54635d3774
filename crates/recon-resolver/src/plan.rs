//! The merge step of a resolution, run inside one store transaction.
//!
//! Candidate contacts may belong to several identities. Each identity is a
//! tree rooted at its primary; the observation joins them all. The root with
//! the lowest `(created_at, id)` stays primary, the other roots become its
//! secondaries, and every contact below them is re-pointed at it so no
//! secondary is left linking to another secondary.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use recon_store::ContactTransaction;
use recon_types::{
    ConsolidatedContact, Contact, ContactId, Link, LinkPrecedence, NewContact, Observation,
};
use tracing::debug;

use crate::error::{ResolveError, ResolveResult};

/// Everything one resolution changed, alongside its consolidated view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub consolidated: ConsolidatedContact,
    /// Former primaries folded into the canonical one.
    pub demoted: Vec<ContactId>,
    /// Secondaries moved from a demoted primary (or a chain) to the
    /// canonical one.
    pub relinked: Vec<ContactId>,
    /// The contact inserted by this resolution, if any.
    pub inserted: Option<ContactId>,
}

impl Reconciliation {
    /// Returns `true` if the resolution wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.demoted.is_empty() && self.relinked.is_empty() && self.inserted.is_none()
    }

    fn created(contact: Contact) -> Self {
        Self {
            consolidated: ConsolidatedContact {
                primary_contact_id: contact.id,
                emails: contact.email.into_iter().collect(),
                phone_numbers: contact.phone.into_iter().collect(),
                secondary_contact_ids: Vec::new(),
            },
            demoted: Vec::new(),
            relinked: Vec::new(),
            inserted: Some(contact.id),
        }
    }
}

/// Resolve `observation` against the contacts visible to `tx`, staging every
/// required change in `tx`. The caller commits.
pub fn reconcile<T>(tx: &mut T, observation: &Observation) -> ResolveResult<Reconciliation>
where
    T: ContactTransaction + ?Sized,
{
    let candidates = tx.find_by_email_or_phone(observation.email(), observation.phone())?;
    if candidates.is_empty() {
        let (email, phone) = observation.clone().into_parts();
        let created = tx.insert(NewContact::primary(email, phone))?;
        debug!(contact = %created.id, "no match, created primary");
        return Ok(Reconciliation::created(created));
    }

    let mut roots: BTreeMap<ContactId, Contact> = BTreeMap::new();
    for candidate in &candidates {
        let root = find_root(tx, candidate)?;
        roots.entry(root.id).or_insert(root);
    }

    let canonical = roots
        .values()
        .min_by_key(|c| c.seniority())
        .cloned()
        .ok_or_else(|| ResolveError::Integrity("candidates resolved to no primary".into()))?;

    let mut demoted: Vec<Contact> = roots
        .values()
        .filter(|root| root.id != canonical.id)
        .cloned()
        .collect();
    demoted.sort_by_key(|c| c.seniority());

    let descendants = collect_descendants(tx, roots.keys().copied())?;

    let canonical_link = Link::secondary_of(canonical.id);
    for root in &demoted {
        tx.update_link(root.id, canonical_link, LinkPrecedence::Primary)?;
    }
    let mut relinked = Vec::new();
    for member in descendants.values() {
        if member.linked_id() != Some(canonical.id) {
            tx.update_link(member.id, canonical_link, LinkPrecedence::Secondary)?;
            relinked.push(member.id);
        }
    }

    let mut others: Vec<&Contact> = demoted.iter().chain(descendants.values()).collect();
    others.sort_by_key(|c| c.seniority());
    let mut emails = DistinctValues::default();
    let mut phones = DistinctValues::default();
    for contact in std::iter::once(&canonical).chain(others) {
        emails.push(contact.email.as_deref());
        phones.push(contact.phone.as_deref());
    }

    let novel_email = observation.email().is_some_and(|e| !emails.contains(e));
    let novel_phone = observation.phone().is_some_and(|p| !phones.contains(p));
    let inserted = if novel_email || novel_phone {
        let (email, phone) = observation.clone().into_parts();
        let contact = tx.insert(NewContact::secondary(email, phone, canonical.id))?;
        emails.push(contact.email.as_deref());
        phones.push(contact.phone.as_deref());
        Some(contact.id)
    } else {
        None
    };

    let demoted_ids: Vec<ContactId> = demoted.iter().map(|c| c.id).collect();
    let secondary_contact_ids = demoted_ids
        .iter()
        .copied()
        .chain(descendants.keys().copied())
        .chain(inserted)
        .collect();

    debug!(
        primary = %canonical.id,
        demoted = demoted_ids.len(),
        relinked = relinked.len(),
        inserted = inserted.is_some(),
        "reconciled observation"
    );

    Ok(Reconciliation {
        consolidated: ConsolidatedContact {
            primary_contact_id: canonical.id,
            emails: emails.into_vec(),
            phone_numbers: phones.into_vec(),
            secondary_contact_ids,
        },
        demoted: demoted_ids,
        relinked,
        inserted,
    })
}

/// Follow links from `contact` up to its primary.
fn find_root<T>(tx: &mut T, contact: &Contact) -> ResolveResult<Contact>
where
    T: ContactTransaction + ?Sized,
{
    let mut visited = HashSet::new();
    let mut current = contact.clone();
    while let Some(parent_id) = current.linked_id() {
        if !visited.insert(current.id) {
            return Err(ResolveError::Integrity(format!(
                "link cycle through contact {}",
                current.id
            )));
        }
        current = tx.get(parent_id)?.ok_or_else(|| {
            ResolveError::Integrity(format!(
                "contact {} links to missing contact {parent_id}",
                current.id
            ))
        })?;
    }
    Ok(current)
}

/// Every contact below `roots`, keyed by id. Healthy identities are one
/// level deep; deeper levels only exist in data written before chains were
/// repaired.
fn collect_descendants<T>(
    tx: &mut T,
    roots: impl IntoIterator<Item = ContactId>,
) -> ResolveResult<BTreeMap<ContactId, Contact>>
where
    T: ContactTransaction + ?Sized,
{
    let roots: BTreeSet<ContactId> = roots.into_iter().collect();
    let mut found = BTreeMap::new();
    let mut queue: VecDeque<ContactId> = roots.iter().copied().collect();
    while let Some(parent) = queue.pop_front() {
        for child in tx.find_linked_to(parent)? {
            if roots.contains(&child.id) || found.contains_key(&child.id) {
                continue;
            }
            queue.push_back(child.id);
            found.insert(child.id, child);
        }
    }
    Ok(found)
}

/// Distinct values in first-seen order.
#[derive(Default)]
struct DistinctValues {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl DistinctValues {
    fn push(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            if self.seen.insert(value.to_string()) {
                self.ordered.push(value.to_string());
            }
        }
    }

    fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}
