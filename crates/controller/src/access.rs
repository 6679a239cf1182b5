//! Invitation integrity and write access decisions.
//!
//! A party's members may self-service their own RSVP records, identified by
//! the party's code word, but must not be able to fabricate invitees. The
//! only way a non-admin request may introduce a new person is by filling a
//! plus-one slot that an existing member of the same party was allocated.
//!
//! Everything in here is a pure function over two in-memory snapshots (the
//! stored records for the batch ids, and the proposed batch); the caller is
//! responsible for fetching state before and persisting after.

use db_storage::parties::{Party, PartyId};
use db_storage::people::{Person, PersonId, UpsertPerson};
use std::collections::HashMap;

/// Why a write was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The batch introduces at least one person not covered by an open
    /// plus-one slot
    UninvitedPeople,
    /// The batch references more than one party (or none at all)
    PartyOverflow,
}

/// Verdict for a proposed batch of person records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeopleWriteAccess {
    /// Write may proceed as-is
    Granted,
    /// Write may proceed once the caller proves possession of the party's
    /// code word
    CodeWordRequired { party: PartyId },
    /// Write must be rejected
    Denied(DenyReason),
}

/// Checks whether the proposed batch introduces people beyond the parties'
/// plus-one allocation.
///
/// Admins may allocate new slots within the same batch that uses them;
/// everyone else can only claim slots that already exist in storage. A slot
/// is consumed the moment a claim matches it, so two new people in one batch
/// cannot share a single sponsor.
pub fn adds_uninvited_people(
    is_admin: bool,
    existing: &[Person],
    proposed: &[UpsertPerson],
) -> bool {
    // open plus-one slots, keyed by sponsor. Sponsors always have an id, so
    // a proposed person without a sponsor reference can never match a slot.
    let mut open_slots: HashMap<PersonId, PartyId> = existing
        .iter()
        .filter(|person| person.gets_plus_one)
        .map(|person| (person.id, person.party))
        .collect();

    if is_admin {
        for person in proposed {
            if person.gets_plus_one {
                open_slots.insert(person.id, person.party);
            }
        }
    }

    for person in proposed {
        if let Some(prior) = existing.iter().find(|prior| prior.id == person.id) {
            // a known attendee updating their own record. If they are a
            // plus-one themselves their sponsor's slot is already taken.
            if prior.is_plus_one {
                if let Some(sponsor) = prior.is_plus_one_of {
                    open_slots.remove(&sponsor);
                }
            }
            continue;
        }

        let Some(sponsor) = person.is_plus_one_of else {
            return true;
        };

        match open_slots.get(&sponsor) {
            None => return true,
            Some(slot_party) if *slot_party != person.party => return true,
            Some(_) => {
                open_slots.remove(&sponsor);
            }
        }
    }

    false
}

/// Decides whether a batch of person records may be written.
///
/// Mirrors the order of checks on the write path: uninvited people first,
/// then the one-party-per-batch rule, then the code-word challenge for
/// everything a member may do on their own.
pub fn evaluate_people_write(
    is_admin: bool,
    existing: &[Person],
    proposed: &[UpsertPerson],
) -> PeopleWriteAccess {
    let uninvited = adds_uninvited_people(is_admin, existing, proposed);

    if uninvited && !is_admin {
        return PeopleWriteAccess::Denied(DenyReason::UninvitedPeople);
    }

    if !is_admin {
        let mut parties = proposed.iter().map(|person| person.party);

        let Some(party) = parties.next() else {
            return PeopleWriteAccess::Denied(DenyReason::PartyOverflow);
        };

        if parties.any(|other| other != party) {
            return PeopleWriteAccess::Denied(DenyReason::PartyOverflow);
        }

        return PeopleWriteAccess::CodeWordRequired { party };
    }

    PeopleWriteAccess::Granted
}

/// Compares a supplied code word against the looked-up parties.
///
/// Only ever matches a single unambiguous party; the word is compared for
/// exact equality.
pub fn code_word_matches(supplied: &str, parties: &[Party]) -> bool {
    if parties.len() != 1 {
        return false;
    }

    parties[0].code_word == supplied
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn party_id(n: u128) -> PartyId {
        PartyId::from(Uuid::from_u128(n))
    }

    fn person_id(n: u128) -> PersonId {
        PersonId::from(Uuid::from_u128(n))
    }

    fn existing(id: PersonId, party: PartyId) -> Person {
        Person {
            id,
            party,
            name: "Alex Doe".into(),
            email: None,
            gets_plus_one: false,
            plus_one: None,
            is_plus_one: false,
            is_plus_one_of: None,
            replied: false,
            attending: false,
            dietary_restrictions: String::new(),
            song_request: String::new(),
            is_child: false,
            will_accompany: None,
            activities: serde_json::json!({}),
        }
    }

    fn sponsor(id: PersonId, party: PartyId) -> Person {
        Person {
            gets_plus_one: true,
            ..existing(id, party)
        }
    }

    fn proposed(id: PersonId, party: PartyId) -> UpsertPerson {
        UpsertPerson {
            id,
            party,
            name: "Sam Doe".into(),
            email: None,
            gets_plus_one: false,
            plus_one: None,
            is_plus_one: false,
            is_plus_one_of: None,
            replied: false,
            attending: false,
            dietary_restrictions: String::new(),
            song_request: String::new(),
            is_child: false,
            will_accompany: None,
            activities: serde_json::json!({}),
        }
    }

    fn proposed_plus_one(id: PersonId, party: PartyId, of: PersonId) -> UpsertPerson {
        UpsertPerson {
            is_plus_one: true,
            is_plus_one_of: Some(of),
            ..proposed(id, party)
        }
    }

    #[test]
    fn updates_of_known_people_are_always_fine() {
        let party = party_id(1);
        let stored = vec![existing(person_id(1), party), existing(person_id(2), party)];

        let batch = vec![proposed(person_id(1), party), proposed(person_id(2), party)];

        assert!(!adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn updating_a_stored_plus_one_needs_no_open_slot() {
        let party = party_id(1);
        let stored = vec![
            sponsor(person_id(1), party),
            Person {
                is_plus_one: true,
                is_plus_one_of: Some(person_id(1)),
                ..existing(person_id(2), party)
            },
        ];

        // the plus-one edits their own record; their sponsor's slot is taken,
        // not newly claimed
        let batch = vec![proposed_plus_one(person_id(2), party, person_id(1))];

        assert!(!adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn new_person_without_sponsor_is_uninvited() {
        let party = party_id(1);
        let stored = vec![existing(person_id(1), party)];

        let batch = vec![proposed(person_id(2), party)];

        assert!(adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn new_person_with_unknown_sponsor_is_uninvited() {
        let party = party_id(1);
        let stored = vec![existing(person_id(1), party)];

        let batch = vec![proposed_plus_one(person_id(2), party, person_id(9))];

        assert!(adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn valid_plus_one_claim_passes() {
        let party = party_id(1);
        let stored = vec![sponsor(person_id(1), party)];

        let batch = vec![proposed_plus_one(person_id(2), party, person_id(1))];

        assert!(!adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn slot_is_consumed_once_per_batch() {
        let party = party_id(1);
        let stored = vec![sponsor(person_id(1), party)];

        let batch = vec![
            proposed_plus_one(person_id(2), party, person_id(1)),
            proposed_plus_one(person_id(3), party, person_id(1)),
        ];

        assert!(adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn slot_cannot_be_claimed_across_parties() {
        let stored = vec![sponsor(person_id(1), party_id(1))];

        let batch = vec![proposed_plus_one(person_id(2), party_id(2), person_id(1))];

        assert!(adds_uninvited_people(false, &stored, &batch));
    }

    #[test]
    fn admins_may_grant_and_use_a_slot_in_one_batch() {
        let party = party_id(1);

        let batch = vec![
            UpsertPerson {
                gets_plus_one: true,
                ..proposed(person_id(1), party)
            },
            proposed_plus_one(person_id(2), party, person_id(1)),
        ];

        assert!(!adds_uninvited_people(true, &[], &batch));
        assert!(adds_uninvited_people(false, &[], &batch));
    }

    #[test]
    fn admin_writes_are_granted() {
        let batch = vec![proposed(person_id(1), party_id(1))];

        assert_eq!(
            evaluate_people_write(true, &[], &batch),
            PeopleWriteAccess::Granted
        );
    }

    #[test]
    fn member_write_requires_the_code_word() {
        let party = party_id(1);
        let stored = vec![sponsor(person_id(1), party)];

        let batch = vec![proposed_plus_one(person_id(2), party, person_id(1))];

        assert_eq!(
            evaluate_people_write(false, &stored, &batch),
            PeopleWriteAccess::CodeWordRequired { party }
        );
    }

    #[test]
    fn member_write_with_second_claim_is_denied() {
        let party = party_id(1);
        let stored = vec![sponsor(person_id(1), party)];

        let batch = vec![
            proposed_plus_one(person_id(2), party, person_id(1)),
            proposed_plus_one(person_id(3), party, person_id(1)),
        ];

        assert_eq!(
            evaluate_people_write(false, &stored, &batch),
            PeopleWriteAccess::Denied(DenyReason::UninvitedPeople)
        );
    }

    #[test]
    fn member_write_must_stay_within_one_party() {
        let stored = vec![
            existing(person_id(1), party_id(1)),
            existing(person_id(2), party_id(2)),
        ];

        let batch = vec![
            proposed(person_id(1), party_id(1)),
            proposed(person_id(2), party_id(2)),
        ];

        assert_eq!(
            evaluate_people_write(false, &stored, &batch),
            PeopleWriteAccess::Denied(DenyReason::PartyOverflow)
        );
    }

    #[test]
    fn empty_batches_reference_no_party() {
        assert_eq!(
            evaluate_people_write(false, &[], &[]),
            PeopleWriteAccess::Denied(DenyReason::PartyOverflow)
        );

        // an admin upserting nothing is a no-op, not an error
        assert_eq!(
            evaluate_people_write(true, &[], &[]),
            PeopleWriteAccess::Granted
        );
    }

    fn party(code_word: &str) -> Party {
        Party {
            id: party_id(1),
            lead: None,
            name: "Doe".into(),
            sort_value: "doe".into(),
            address: String::new(),
            code_word: code_word.into(),
        }
    }

    #[test]
    fn code_word_must_match_exactly_one_party() {
        assert!(code_word_matches("hunter2", &[party("hunter2")]));

        assert!(!code_word_matches("hunter2", &[party("hunter3")]));
        assert!(!code_word_matches("hunter2", &[]));
        assert!(!code_word_matches(
            "hunter2",
            &[party("hunter2"), party("hunter2")]
        ));
    }
}
