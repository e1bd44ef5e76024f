use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use tracing::debug;

use super::KvStore;
use crate::errors::ShopError;

const PK: &str = "pk";
const SK: &str = "sk";
const DOC: &str = "doc";

/// DynamoDB backend: partition key = tenant, sort key = record key, `doc` = JSON.
pub struct DynamoStore {
    client: DynamoClient,
    table: String,
}

impl DynamoStore {
    pub async fn from_env(table: &str) -> Self {
        let shared = aws_config::from_env().load().await;
        Self {
            client: DynamoClient::new(&shared),
            table: table.to_string(),
        }
    }

    #[must_use]
    pub fn new(client: DynamoClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
        }
    }
}

fn doc_of(item: &HashMap<String, AttributeValue>) -> Result<String, ShopError> {
    item.get(DOC)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| ShopError::StorageError("item missing doc attribute".to_string()))
}

#[async_trait]
impl KvStore for DynamoStore {
    async fn get(&self, tenant: &str, key: &str) -> Result<Option<String>, ShopError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(PK, AttributeValue::S(tenant.to_string()))
            .key(SK, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await?;
        out.item().map(doc_of).transpose()
    }

    async fn put(&self, tenant: &str, key: &str, value: String) -> Result<(), ShopError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item(PK, AttributeValue::S(tenant.to_string()))
            .item(SK, AttributeValue::S(key.to_string()))
            .item(DOC, AttributeValue::S(value))
            .send()
            .await?;
        Ok(())
    }

    async fn delete(&self, tenant: &str, key: &str) -> Result<bool, ShopError> {
        let out = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key(PK, AttributeValue::S(tenant.to_string()))
            .key(SK, AttributeValue::S(key.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await?;
        Ok(out.attributes().is_some_and(|a| !a.is_empty()))
    }

    async fn scan(&self, tenant: &str, prefix: &str) -> Result<Vec<(String, String)>, ShopError> {
        let mut results = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let out = self
                .client
                .query()
                .table_name(&self.table)
                .key_condition_expression("#pk = :pk AND begins_with(#sk, :prefix)")
                .expression_attribute_names("#pk", PK)
                .expression_attribute_names("#sk", SK)
                .expression_attribute_values(":pk", AttributeValue::S(tenant.to_string()))
                .expression_attribute_values(":prefix", AttributeValue::S(prefix.to_string()))
                .set_exclusive_start_key(start_key.take())
                .consistent_read(true)
                .send()
                .await?;

            for item in out.items() {
                let key = item
                    .get(SK)
                    .and_then(|v| v.as_s().ok())
                    .cloned()
                    .ok_or_else(|| ShopError::StorageError("item missing sk".to_string()))?;
                results.push((key, doc_of(item)?));
            }

            match out.last_evaluated_key() {
                Some(last) if !last.is_empty() => {
                    debug!(tenant, prefix, fetched = results.len(), "Continuing paginated query");
                    start_key = Some(last.clone());
                }
                _ => break,
            }
        }

        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }
}
