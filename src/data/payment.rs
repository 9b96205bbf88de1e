use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cart::EnrolledClass;
use crate::util::{bson_date_time, object_id};

pub static PAYMENT_COLLECTION_NAME: &str = "paymentHistory";

/// Append-only record of a payment that reached the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    #[serde(
        rename = "_id",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "object_id::deserialize"
    )]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(default)]
    pub amount: f64,
    /// Stored as a BSON date so listings sort chronologically.
    #[serde(default = "Utc::now", with = "bson_date_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl PaymentRecord {
    pub fn new(email: impl ToString, class_id: impl ToString, amount: f64) -> PaymentRecord {
        PaymentRecord {
            id: None,
            email: email.to_string(),
            class_id: class_id.to_string(),
            amount,
            timestamp: Utc::now(),
            fields: Document::new(),
        }
    }
}

/// New counters for the purchased class, as computed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeatUpdate {
    pub id: String,
    pub seats: i64,
    pub enroled: i64,
}

/// Everything `/payment` writes, in the order it's written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentBundle {
    pub payment: PaymentRecord,
    pub class: SeatUpdate,
    pub enrollment: EnrolledClass,
    /// Cart entry removed once the student is enrolled.
    #[serde(rename = "selectedId")]
    pub selected_id: String,
}

/// A [PaymentBundle] with its identifiers already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentWrites {
    pub payment: PaymentRecord,
    pub class_id: ObjectId,
    pub seats: i64,
    pub enroled: i64,
    pub enrollment: EnrolledClass,
    pub selected_id: ObjectId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::util::bson_to_json;

    #[test]
    fn bundle_reads_client_shape() {
        let class_id = ObjectId::new().to_hex();
        let selected_id = ObjectId::new().to_hex();

        let bundle: PaymentBundle = serde_json::from_value(json!({
            "payment": {
                "email": "student@x.com",
                "classId": class_id,
                "amount": 40.0,
                "transactionId": "pi_123",
            },
            "class": { "id": class_id, "seats": 9, "enroled": 3 },
            "enrollment": { "email": "student@x.com", "classId": class_id },
            "selectedId": selected_id,
        }))
        .expect("valid bundle");

        assert_eq!(bundle.class.seats, 9);
        assert_eq!(bundle.selected_id, selected_id);
        assert_eq!(
            bundle.payment.fields.get_str("transactionId").ok(),
            Some("pi_123")
        );
    }

    #[test]
    fn timestamp_is_stored_as_date() {
        let mut record = PaymentRecord::new("student@x.com", "C1", 20.0);
        record.timestamp = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();

        let stored = bson::to_document(&record).expect("record serializes");
        assert!(stored.get_datetime("timestamp").is_ok());

        let read: PaymentRecord = bson::from_document(stored.clone()).expect("record reads back");
        assert_eq!(read.timestamp, record.timestamp);

        let rendered = bson_to_json(bson::Bson::Document(stored));
        let text = rendered["timestamp"].as_str().expect("date rendered as string");
        assert_eq!(
            DateTime::parse_from_rfc3339(text).map(|it| it.with_timezone(&Utc)),
            Ok(record.timestamp)
        );
    }

    #[test]
    fn client_timestamp_string_is_accepted() {
        let record: PaymentRecord = serde_json::from_value(json!({
            "email": "student@x.com",
            "classId": "C1",
            "amount": 5,
            "timestamp": "2023-06-01T10:00:00.500Z",
        }))
        .expect("valid record");

        let second = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(record.timestamp, second + chrono::Duration::milliseconds(500));
    }
}
