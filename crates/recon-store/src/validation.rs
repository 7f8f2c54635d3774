use std::collections::{BTreeMap, HashMap};

use recon_types::{Contact, ContactId};

/// Result of auditing a set of contacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForestReport {
    pub contact_count: usize,
    pub primary_count: usize,
    /// Number of connected identities (contacts joined by a shared email,
    /// a shared phone, or a link).
    pub identity_count: usize,
    pub violations: Vec<Violation>,
}

impl ForestReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific invariant violation found in the contact forest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub contact: ContactId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// A secondary links to an id that does not exist.
    DanglingLink,
    /// A secondary links to another secondary.
    Chain,
    /// One identity has more than one primary.
    MultiplePrimaries,
    /// One identity has no primary at all.
    NoPrimary,
    /// The primary of an identity is not its oldest contact.
    NotEarliestPrimary,
    /// An email or phone is present but blank.
    BlankValue,
}

/// Audit `contacts` for the identity invariants:
///
/// - every secondary links to an existing primary (no chains),
/// - every connected identity has exactly one primary,
/// - that primary is the identity's earliest contact (ties by smaller id),
/// - no stored email or phone is blank.
pub fn validate_forest(contacts: &[Contact]) -> ForestReport {
    let by_id: HashMap<ContactId, &Contact> = contacts.iter().map(|c| (c.id, c)).collect();
    let mut violations = Vec::new();

    for contact in contacts {
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
        if blank(&contact.email) || blank(&contact.phone) {
            violations.push(Violation {
                contact: contact.id,
                kind: ViolationKind::BlankValue,
                description: "email or phone is present but blank".into(),
            });
        }

        if let Some(target) = contact.linked_id() {
            match by_id.get(&target) {
                None => violations.push(Violation {
                    contact: contact.id,
                    kind: ViolationKind::DanglingLink,
                    description: format!("links to missing contact {target}"),
                }),
                Some(parent) if !parent.is_primary() => violations.push(Violation {
                    contact: contact.id,
                    kind: ViolationKind::Chain,
                    description: format!("links to secondary contact {target}"),
                }),
                Some(_) => {}
            }
        }
    }

    let components = identities(contacts, &by_id);
    let mut primary_count = 0;
    for members in components.values() {
        let primaries: Vec<&Contact> = members.iter().filter(|c| c.is_primary()).copied().collect();
        primary_count += primaries.len();

        let Some(eldest) = members.iter().min_by_key(|c| c.seniority()) else {
            continue;
        };
        match primaries.as_slice() {
            [] => violations.push(Violation {
                contact: eldest.id,
                kind: ViolationKind::NoPrimary,
                description: format!("identity of {} contacts has no primary", members.len()),
            }),
            [only] => {
                if only.id != eldest.id {
                    violations.push(Violation {
                        contact: only.id,
                        kind: ViolationKind::NotEarliestPrimary,
                        description: format!("contact {} is older than the primary", eldest.id),
                    });
                }
            }
            many => {
                for extra in many.iter().filter(|p| p.id != eldest.id) {
                    violations.push(Violation {
                        contact: extra.id,
                        kind: ViolationKind::MultiplePrimaries,
                        description: format!(
                            "identity has {} primaries, eldest contact is {}",
                            many.len(),
                            eldest.id
                        ),
                    });
                }
            }
        }
    }

    violations.sort_by_key(|v| v.contact);
    ForestReport {
        contact_count: contacts.len(),
        primary_count,
        identity_count: components.len(),
        violations,
    }
}

/// Group contacts into connected identities with a union-find over shared
/// values and links.
fn identities<'a>(
    contacts: &'a [Contact],
    by_id: &HashMap<ContactId, &'a Contact>,
) -> BTreeMap<ContactId, Vec<&'a Contact>> {
    let mut parent: HashMap<ContactId, ContactId> = contacts.iter().map(|c| (c.id, c.id)).collect();

    fn find(parent: &mut HashMap<ContactId, ContactId>, id: ContactId) -> ContactId {
        let mut root = id;
        while let Some(&next) = parent.get(&root) {
            if next == root {
                break;
            }
            root = next;
        }
        let mut cursor = id;
        while cursor != root {
            let next = parent[&cursor];
            parent.insert(cursor, root);
            cursor = next;
        }
        root
    }

    fn union(parent: &mut HashMap<ContactId, ContactId>, a: ContactId, b: ContactId) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent.insert(merge, keep);
        }
    }

    let mut first_by_email: HashMap<&str, ContactId> = HashMap::new();
    let mut first_by_phone: HashMap<&str, ContactId> = HashMap::new();
    for contact in contacts {
        if let Some(email) = contact.email.as_deref() {
            let first = *first_by_email.entry(email).or_insert(contact.id);
            union(&mut parent, first, contact.id);
        }
        if let Some(phone) = contact.phone.as_deref() {
            let first = *first_by_phone.entry(phone).or_insert(contact.id);
            union(&mut parent, first, contact.id);
        }
        if let Some(target) = contact.linked_id() {
            if by_id.contains_key(&target) {
                union(&mut parent, target, contact.id);
            }
        }
    }

    let mut groups: BTreeMap<ContactId, Vec<&Contact>> = BTreeMap::new();
    for contact in contacts {
        let root = find(&mut parent, contact.id);
        groups.entry(root).or_default().push(contact);
    }
    groups
}
