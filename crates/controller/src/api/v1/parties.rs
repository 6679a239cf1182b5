//! Party related API structs and Endpoints
//!
//! The defined structs are exposed to the REST API and will be serialized/deserialized. Similar
//! structs are defined in the Database crate [`db_storage`] for database operations.
use super::middleware::auth::Requester;
use super::request::collect_id_params;
use super::response::error::ApiError;
use actix_web::web::{Data, Json, Query, ReqData};
use actix_web::{get, put};
use database::Db;
use db_storage::parties::{self as db_parties, Party, PartyId};
use db_storage::people::PersonId;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public party details
///
/// Contains the full party record. Only ever returned to admins or to
/// requesters that supplied the party's code word, so the code word itself
/// is included.
#[derive(Debug, Serialize)]
pub struct PartyDetails {
    pub id: PartyId,
    pub lead: Option<PersonId>,
    pub name: String,
    pub sort_value: String,
    pub address: String,
    pub code_word: String,
}

impl From<Party> for PartyDetails {
    fn from(party: Party) -> Self {
        Self {
            id: party.id,
            lead: party.lead,
            name: party.name,
            sort_value: party.sort_value,
            address: party.address,
            code_word: party.code_word,
        }
    }
}

/// Body entry for *PUT /parties*
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPartyBody {
    pub id: Option<PartyId>,
    pub lead: Option<PersonId>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub sort_value: String,
    #[serde(default)]
    pub address: String,
    #[validate(length(min = 1, max = 255))]
    pub code_word: String,
}

impl UpsertPartyBody {
    fn into_record(self) -> db_parties::UpsertParty {
        db_parties::UpsertParty {
            id: self
                .id
                .unwrap_or_else(|| PartyId::from(uuid::Uuid::new_v4())),
            lead: self.lead,
            name: self.name,
            sort_value: self.sort_value,
            address: self.address,
            code_word: self.code_word,
        }
    }
}

/// API Endpoint *PUT /parties*
///
/// Batch upsert of parties. Records without an id are created under a
/// generated one, everything else is updated in place. Admin only.
#[put("/parties")]
pub async fn put_parties(
    db: Data<Db>,
    requester: ReqData<Requester>,
    body: Json<Vec<UpsertPartyBody>>,
) -> Result<Json<Vec<PartyDetails>>, ApiError> {
    if !requester.is_admin() {
        return Err(ApiError::unauthorized());
    }

    let entries = body.into_inner();

    for entry in &entries {
        entry.validate()?;
    }

    let records = entries
        .into_iter()
        .map(UpsertPartyBody::into_record)
        .collect::<Vec<_>>();

    let parties = crate::block(move || -> database::Result<_> {
        let mut conn = db.get_conn()?;

        db_parties::UpsertParty::upsert_all(&mut conn, records)
    })
    .await??;

    Ok(Json(parties.into_iter().map(Into::into).collect()))
}

/// API Endpoint *GET /parties*
///
/// Three modes, checked in order:
/// - `?party_id=…` (repeatable): the given parties, admin only
/// - `?code_word=…`: the single party holding that code word, open to anyone;
///   404 when no party (or more than one) holds it
/// - no parameters: all parties ordered by their sort value, admin only
#[get("/parties")]
pub async fn get_parties(
    db: Data<Db>,
    requester: ReqData<Requester>,
    query: Query<Vec<(String, String)>>,
) -> Result<Json<Vec<PartyDetails>>, ApiError> {
    let party_ids = collect_id_params(&query, "party_id", PartyId::from)?;
    let code_word = query
        .iter()
        .find(|(name, _)| name == "code_word")
        .map(|(_, value)| value.clone());

    let parties = if !party_ids.is_empty() {
        if !requester.is_admin() {
            return Err(ApiError::unauthorized());
        }

        crate::block(move || -> database::Result<_> {
            let mut conn = db.get_conn()?;

            Party::get(&mut conn, &party_ids)
        })
        .await??
    } else if let Some(code_word) = code_word {
        let party = crate::block(move || -> database::Result<_> {
            let mut conn = db.get_conn()?;

            Party::get_by_code_word(&mut conn, &code_word)
        })
        .await??;

        match party {
            Some(party) => vec![party],
            None => {
                return Err(ApiError::not_found()
                    .with_code("unknown_code_word")
                    .with_message("No party matches the given code word"))
            }
        }
    } else {
        if !requester.is_admin() {
            return Err(ApiError::unauthorized());
        }

        crate::block(move || -> database::Result<_> {
            let mut conn = db.get_conn()?;

            Party::get_all(&mut conn)
        })
        .await??
    };

    Ok(Json(parties.into_iter().map(Into::into).collect()))
}
