//! Person related API structs and Endpoints
//!
//! The write path is where the invitation integrity rules live: every batch
//! runs through [`crate::access`] before anything is persisted.
use super::middleware::auth::Requester;
use super::request::{collect_id_params, CodeWord};
use super::response::error::ApiError;
use crate::access::{self, DenyReason, PeopleWriteAccess};
use actix_web::web::{Data, Json, Query, ReqData};
use actix_web::{get, put};
use database::Db;
use db_storage::parties::{Party, PartyId};
use db_storage::people::{self as db_people, Person, PersonId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public person details
#[derive(Debug, Serialize)]
pub struct PersonDetails {
    pub id: PersonId,
    pub party: PartyId,
    pub name: String,
    pub email: Option<String>,
    pub gets_plus_one: bool,
    pub plus_one: Option<PersonId>,
    pub is_plus_one: bool,
    pub is_plus_one_of: Option<PersonId>,
    pub replied: bool,
    pub attending: bool,
    pub dietary_restrictions: String,
    pub song_request: String,
    pub is_child: bool,
    pub will_accompany: Option<PersonId>,
    pub activities: serde_json::Value,
}

impl From<Person> for PersonDetails {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            party: person.party,
            name: person.name,
            email: person.email,
            gets_plus_one: person.gets_plus_one,
            plus_one: person.plus_one,
            is_plus_one: person.is_plus_one,
            is_plus_one_of: person.is_plus_one_of,
            replied: person.replied,
            attending: person.attending,
            dietary_restrictions: person.dietary_restrictions,
            song_request: person.song_request,
            is_child: person.is_child,
            will_accompany: person.will_accompany,
            activities: person.activities,
        }
    }
}

/// Body entry for *PUT /people*
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPersonBody {
    pub id: Option<PersonId>,
    pub party: PartyId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub gets_plus_one: bool,
    pub plus_one: Option<PersonId>,
    #[serde(default)]
    pub is_plus_one: bool,
    pub is_plus_one_of: Option<PersonId>,
    #[serde(default)]
    pub replied: bool,
    #[serde(default)]
    pub attending: bool,
    #[serde(default)]
    pub dietary_restrictions: String,
    #[serde(default)]
    pub song_request: String,
    #[serde(default)]
    pub is_child: bool,
    pub will_accompany: Option<PersonId>,
    #[serde(default = "default_activities")]
    pub activities: serde_json::Value,
}

fn default_activities() -> serde_json::Value {
    serde_json::json!({})
}

impl UpsertPersonBody {
    fn into_record(self) -> db_people::UpsertPerson {
        db_people::UpsertPerson {
            id: self
                .id
                .unwrap_or_else(|| PersonId::from(uuid::Uuid::new_v4())),
            party: self.party,
            name: self.name,
            email: self.email,
            gets_plus_one: self.gets_plus_one,
            plus_one: self.plus_one,
            is_plus_one: self.is_plus_one,
            is_plus_one_of: self.is_plus_one_of,
            replied: self.replied,
            attending: self.attending,
            dietary_restrictions: self.dietary_restrictions,
            song_request: self.song_request,
            is_child: self.is_child,
            will_accompany: self.will_accompany,
            activities: self.activities,
        }
    }
}

/// API Endpoint *PUT /people*
///
/// Batch upsert of people. The batch as a whole is allowed or denied:
/// admins may write anything, party members may update known attendees and
/// fill open plus-one slots within their own party after proving possession
/// of the party's code word.
#[put("/people")]
pub async fn put_people(
    db: Data<Db>,
    requester: ReqData<Requester>,
    code_word: CodeWord,
    body: Json<Vec<UpsertPersonBody>>,
) -> Result<Json<Vec<PersonDetails>>, ApiError> {
    let entries = body.into_inner();

    for entry in &entries {
        entry.validate()?;
    }

    let is_admin = requester.is_admin();
    let records = entries
        .into_iter()
        .map(UpsertPersonBody::into_record)
        .collect::<Vec<_>>();

    let people = crate::block(move || -> Result<Vec<Person>, ApiError> {
        let mut conn = db.get_conn()?;

        // the batch may mix updates and new records; fetch the stored state
        // of everything it references before deciding
        let ids = records.iter().map(|record| record.id).collect::<Vec<_>>();
        let existing = Person::get(&mut conn, &ids)?;

        match access::evaluate_people_write(is_admin, &existing, &records) {
            PeopleWriteAccess::Granted => {}
            PeopleWriteAccess::Denied(DenyReason::UninvitedPeople) => {
                return Err(ApiError::unauthorized()
                    .with_code("uninvited_people")
                    .with_message(
                        "The batch adds people beyond the party's plus-one allocation",
                    ));
            }
            PeopleWriteAccess::Denied(DenyReason::PartyOverflow) => {
                return Err(ApiError::bad_request()
                    .with_code("party_overflow")
                    .with_message("A batch must reference exactly one party"));
            }
            PeopleWriteAccess::CodeWordRequired { party } => {
                let parties = Party::get(&mut conn, &[party])?;

                if !access::code_word_matches(code_word.as_deref().unwrap_or_default(), &parties)
                {
                    return Err(ApiError::forbidden()
                        .with_code("code_word_mismatch")
                        .with_message("The supplied code word does not match the party"));
                }
            }
        }

        let people = db_people::UpsertPerson::upsert_all(&mut conn, records)?;

        Ok(people)
    })
    .await??;

    Ok(Json(people.into_iter().map(Into::into).collect()))
}

/// API Endpoint *GET /people*
///
/// Three modes, checked in order:
/// - `?person_id=…` (repeatable): the given people. Intentionally
///   unauthenticated; person ids are unguessable and only handed out through
///   authorized paths
/// - `?party_id=…`: all people of that party, for admins or requesters
///   presenting the party's code word. An unknown party and a wrong code
///   word are indistinguishable from the outside
/// - no parameters: all people, admin only
#[get("/people")]
pub async fn get_people(
    db: Data<Db>,
    requester: ReqData<Requester>,
    code_word: CodeWord,
    query: Query<Vec<(String, String)>>,
) -> Result<Json<Vec<PersonDetails>>, ApiError> {
    let person_ids = collect_id_params(&query, "person_id", PersonId::from)?;
    let party_id = collect_id_params(&query, "party_id", PartyId::from)?
        .into_iter()
        .next();

    let people = if !person_ids.is_empty() {
        crate::block(move || -> database::Result<_> {
            let mut conn = db.get_conn()?;

            Person::get(&mut conn, &person_ids)
        })
        .await??
    } else if let Some(party_id) = party_id {
        let is_admin = requester.is_admin();
        let supplied = code_word.as_deref().unwrap_or_default().to_owned();

        crate::block(move || -> Result<Vec<Person>, ApiError> {
            let mut conn = db.get_conn()?;

            if !is_admin {
                let parties = Party::get(&mut conn, &[party_id])?;

                if !access::code_word_matches(&supplied, &parties) {
                    return Err(ApiError::unauthorized());
                }
            }

            let people = Person::get_for_party(&mut conn, party_id)?;

            Ok(people)
        })
        .await??
    } else {
        if !requester.is_admin() {
            return Err(ApiError::unauthorized());
        }

        crate::block(move || -> database::Result<_> {
            let mut conn = db.get_conn()?;

            Person::get_all(&mut conn)
        })
        .await??
    };

    Ok(Json(people.into_iter().map(Into::into).collect()))
}
