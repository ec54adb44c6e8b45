use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    CounterEntity, ServedRecordEntity, ServiceTypeEntity, TicketEntity, code_suffix,
};

pub const SERVICE_TYPE_COLLECTION: &str = "service_types";
pub const COUNTER_COLLECTION: &str = "counters";
pub const TICKET_COLLECTION: &str = "tickets";
pub const SERVED_COLLECTION: &str = "served_tickets";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoServiceTypeDocument {
    #[serde(rename = "_id")]
    id: String,
    tag: String,
    average_service_time: i64,
    #[serde(default)]
    description: Option<String>,
}

impl From<ServiceTypeEntity> for MongoServiceTypeDocument {
    fn from(value: ServiceTypeEntity) -> Self {
        Self {
            id: value.id.to_string(),
            tag: value.tag,
            average_service_time: i64::from(value.average_service_time),
            description: value.description,
        }
    }
}

impl TryFrom<MongoServiceTypeDocument> for ServiceTypeEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoServiceTypeDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(SERVICE_TYPE_COLLECTION, &value.id)?,
            tag: value.tag,
            average_service_time: value.average_service_time.clamp(0, i64::from(u32::MAX)) as u32,
            description: value.description,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCounterDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    service_ids: Vec<String>,
}

impl MongoCounterDocument {
    /// Service ids in preference order.
    pub fn service_ids(&self) -> Result<Vec<Uuid>, MongoDaoError> {
        self.service_ids
            .iter()
            .map(|raw| parse_id(COUNTER_COLLECTION, raw))
            .collect()
    }
}

impl From<CounterEntity> for MongoCounterDocument {
    fn from(value: CounterEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            service_ids: value.service_ids.iter().map(Uuid::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTicketDocument {
    #[serde(rename = "_id")]
    pub id: String,
    code: String,
    service_id: String,
    issued_at: DateTime,
    /// Numeric suffix of `code`, kept to order tickets issued within the same millisecond.
    #[serde(default)]
    sequence: Option<i64>,
}

impl MongoTicketDocument {
    pub fn new(service_id: Uuid, code: String) -> Self {
        let sequence = code_suffix(&code).and_then(|value| i64::try_from(value).ok());
        Self {
            id: Uuid::new_v4().to_string(),
            code,
            service_id: service_id.to_string(),
            issued_at: DateTime::now(),
            sequence,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl TryFrom<MongoTicketDocument> for TicketEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoTicketDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(TICKET_COLLECTION, &value.id)?,
            code: value.code,
            service_id: parse_id(TICKET_COLLECTION, &value.service_id)?,
            issued_at: value.issued_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoServedDocument {
    #[serde(rename = "_id")]
    id: String,
    pub ticket_id: String,
    counter_id: String,
    served_at: DateTime,
    #[serde(default)]
    ended_at: Option<DateTime>,
}

impl From<ServedRecordEntity> for MongoServedDocument {
    fn from(value: ServedRecordEntity) -> Self {
        Self {
            id: value.id.to_string(),
            ticket_id: value.ticket_id.to_string(),
            counter_id: value.counter_id.to_string(),
            served_at: DateTime::from_system_time(value.served_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
        }
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_id(collection: &'static str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::InvalidDocId {
        collection,
        doc_id: raw.to_owned(),
    })
}
