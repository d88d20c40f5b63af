//! AMQP publisher
//!
//! Holds only the parsed connection URI. Every publish opens a fresh
//! connection, sends one non-persistent message to the default exchange with
//! the topic as routing key, and closes again. This is slower per call than
//! the ZeroMQ publisher but never keeps a broker connection open.

use std::collections::HashMap;

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::uri::AMQPUri;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use serde_json::Value;
use tracing::{debug, info};

use super::{PublishError, Publisher};
use crate::utils::{RelayError, Result};

const CONTENT_TYPE: &str = "application/json";
const CONTENT_ENCODING: &str = "utf-8";
/// AMQP delivery mode 1 is non-persistent.
const DELIVERY_MODE_TRANSIENT: u8 = 1;
const REPLY_SUCCESS: u16 = 200;

/// A message ready to hand to `basic_publish`.
#[derive(Debug, Clone)]
pub struct AmqpEnvelope {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub properties: BasicProperties,
}

impl AmqpEnvelope {
    pub fn encode(
        topic: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> std::result::Result<Self, PublishError> {
        let mut table = FieldTable::default();
        for (key, value) in headers {
            table.insert(
                ShortString::from(key.clone()),
                AMQPValue::LongString(LongString::from(value.clone())),
            );
        }

        let properties = BasicProperties::default()
            .with_content_type(ShortString::from(CONTENT_TYPE))
            .with_content_encoding(ShortString::from(CONTENT_ENCODING))
            .with_headers(table)
            .with_delivery_mode(DELIVERY_MODE_TRANSIENT);

        Ok(Self {
            routing_key: topic.to_string(),
            payload: serde_json::to_vec(body)?,
            properties,
        })
    }

    pub fn decode_body(&self) -> std::result::Result<Value, PublishError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

pub struct AmqpPublisher {
    name: String,
    uri: AMQPUri,
}

impl AmqpPublisher {
    pub fn new(name: impl Into<String>, amqp_url: &str) -> Result<Self> {
        let name = name.into();
        let uri = amqp_url
            .parse::<AMQPUri>()
            .map_err(|reason| RelayError::InvalidBackend {
                name: name.clone(),
                reason,
            })?;
        info!(
            "Publishing over AMQP to {}:{}",
            uri.authority.host, uri.authority.port
        );
        Ok(Self { name, uri })
    }

    async fn send(&self, envelope: AmqpEnvelope) -> std::result::Result<(), PublishError> {
        let connection = Connection::connect_uri(self.uri.clone(), ConnectionProperties::default())
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        let confirm = channel
            .basic_publish(
                "",
                &envelope.routing_key,
                BasicPublishOptions::default(),
                &envelope.payload,
                envelope.properties,
            )
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        confirm
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if let Err(e) = channel.close(REPLY_SUCCESS, "OK").await {
            debug!("failed to close AMQP channel cleanly: {e}");
        }
        connection
            .close(REPLY_SUCCESS, "OK")
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))
    }
}

impl std::fmt::Debug for AmqpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // credentials stay out of logs
        f.debug_struct("AmqpPublisher")
            .field("name", &self.name)
            .field("host", &self.uri.authority.host)
            .field("port", &self.uri.authority.port)
            .finish()
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(
        &mut self,
        topic: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> std::result::Result<(), PublishError> {
        info!("Publishing message on \"{topic}\" over AMQP");
        let envelope = AmqpEnvelope::encode(topic, headers, body)?;
        self.send(envelope).await
    }
}
