use crate::config::GatewayConfig;
use crate::domain::payment::{Charge, GatewayResource, PaymentResource, Shipment};
use crate::domain::ports::GatewayClient;
use crate::domain::webhook::WebhookEvent;
use crate::error::{GatewayError, PayhookError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Gateway client talking to the payment API over HTTPS.
///
/// Every request authenticates with the private key as the basic-auth user, so
/// requests only ever go to the configured API origin.
pub struct HttpGatewayClient {
    client: Client,
    base_url: Url,
    private_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipRequest<'a> {
    invoice_id: &'a str,
}

impl HttpGatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GatewayError::from)?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: GatewayConfig, client: Client) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            PayhookError::Config(format!("invalid api base url {}: {e}", config.api_base_url))
        })?;
        Ok(Self {
            client,
            base_url,
            private_key: config.private_key,
        })
    }

    fn payment_url(&self, payment_id: &str) -> String {
        format!(
            "{}/v1/payments/{payment_id}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Accepts a webhook's retrieve URL only when it points at the API origin.
    fn resource_url(&self, retrieve_url: &str) -> std::result::Result<Url, GatewayError> {
        let url = Url::parse(retrieve_url)
            .map_err(|_| GatewayError::UntrustedUrl(retrieve_url.to_string()))?;
        if url.origin() != self.base_url.origin() {
            return Err(GatewayError::UntrustedUrl(retrieve_url.to_string()));
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> std::result::Result<T, GatewayError> {
        let response = request
            .basic_auth(&self.private_key, None::<&str>)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{url}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<T, GatewayError> {
        tracing::debug!(url, "GET");
        self.send(self.client.get(url), url).await
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn fetch_resource_from_event(
        &self,
        event: &WebhookEvent,
    ) -> std::result::Result<GatewayResource, GatewayError> {
        let url = match self.resource_url(&event.retrieve_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    retrieve_url = %event.retrieve_url,
                    api = %self.base_url,
                    "Refusing to fetch resource outside the gateway API"
                );
                return Err(e);
            }
        };
        self.get(url.as_str()).await
    }

    async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> std::result::Result<PaymentResource, GatewayError> {
        self.get(&self.payment_url(payment_id)).await
    }

    async fn fetch_payment_by_order_id(
        &self,
        order_id: &str,
    ) -> std::result::Result<PaymentResource, GatewayError> {
        // The payments endpoint resolves order ids as well as payment ids.
        self.get(&self.payment_url(order_id)).await
    }

    async fn fetch_charge_by_id(
        &self,
        payment_id: &str,
        charge_id: &str,
    ) -> std::result::Result<Charge, GatewayError> {
        let url = format!("{}/charges/{charge_id}", self.payment_url(payment_id));
        let mut charge: Charge = self.get(&url).await?;
        charge.payment_id.get_or_insert_with(|| payment_id.to_string());
        Ok(charge)
    }

    async fn ship(
        &self,
        payment_id: &str,
        invoice_document_id: &str,
    ) -> std::result::Result<Shipment, GatewayError> {
        let url = format!("{}/shipments", self.payment_url(payment_id));
        tracing::debug!(url, "POST");

        let request = self.client.post(&url).json(&ShipRequest {
            invoice_id: invoice_document_id,
        });
        let mut shipment: Shipment = self.send(request, &url).await?;
        shipment.payment_id.get_or_insert_with(|| payment_id.to_string());
        Ok(shipment)
    }
}
