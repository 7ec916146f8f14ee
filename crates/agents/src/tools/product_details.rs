use std::fmt::Write as _;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use snoozy_core::domain::product::{Product, ProductId};
use snoozy_db::repositories::ProductRepository;

use super::{parse_args, ToolError};
use crate::catalog::ProductResolver;
use crate::llm::ToolSpec;

/// Product information specialty: lookups and side-by-side comparisons.
pub struct ProductDetailsTools {
    products: Arc<dyn ProductRepository>,
}

#[derive(Debug, Deserialize)]
struct GetProductDetailsArgs {
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct CompareProductsArgs {
    product_ids: Vec<String>,
}

impl ProductDetailsTools {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_product_details",
                description: "Get detailed information about a specific mattress product",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "Name or ID of the product to retrieve details for"
                        }
                    },
                    "required": ["product_id"]
                }),
            },
            ToolSpec {
                name: "compare_products",
                description: "Compare multiple mattress products",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_ids": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Names or IDs of products to compare",
                            "minItems": 1
                        }
                    },
                    "required": ["product_ids"]
                }),
            },
        ]
    }

    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        match name {
            "get_product_details" => {
                let args: GetProductDetailsArgs = parse_args("get_product_details", arguments)?;
                self.get_product_details(&args.product_id).await
            }
            "compare_products" => {
                let args: CompareProductsArgs = parse_args("compare_products", arguments)?;
                self.compare_products(&args.product_ids).await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn get_product_details(&self, reference: &str) -> Result<Value, ToolError> {
        debug!(event_name = "tools.product_details.lookup", reference, "getting product details");

        let product = match self.products.find_by_id(&ProductId(reference.to_string())).await? {
            Some(product) => product,
            None => self
                .products
                .find_by_name_prefix(reference)
                .await?
                .ok_or_else(|| ToolError::ProductNotFound(reference.to_string()))?,
        };

        Ok(format_product(&product))
    }

    async fn compare_products(&self, references: &[String]) -> Result<Value, ToolError> {
        debug!(
            event_name = "tools.product_details.compare",
            count = references.len(),
            "comparing products"
        );

        let catalog = self.products.list_all().await?;
        let resolver = ProductResolver::from_products(&catalog);

        let mut compared = Vec::new();
        let mut not_found = Vec::new();

        for reference in references {
            match resolver.resolve(reference) {
                Some(summary) => {
                    if let Some(product) =
                        catalog.iter().find(|product| product.id == summary.id)
                    {
                        compared.push(format_product(product));
                    }
                }
                None => {
                    warn!(
                        event_name = "tools.product_details.unresolved",
                        reference = reference.as_str(),
                        "no matching product for comparison reference"
                    );
                    not_found.push(reference.clone());
                }
            }
        }

        let mut response = json!({
            "total_products": compared.len(),
            "products": compared,
        });

        if !not_found.is_empty() {
            response["not_found"] = json!({
                "products": not_found,
                "available_products": resolver.product_names(),
            });
        }

        Ok(response)
    }

    pub async fn system_prompt(&self) -> Result<String, ToolError> {
        let products = self.products.list_all().await?;

        let mut product_info = String::new();
        for product in &products {
            let features = product
                .key_features
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(
                product_info,
                "\nProduct ID: {}\nName: {}\nType: {}\nPrice: ${}\nKey Features: {}\nBest For: {}\n",
                product.id,
                product.name,
                product.kind,
                product.price,
                features,
                product.best_for.join(", "),
            );
        }

        Ok(format!(
            "You are a friendly and knowledgeable mattress expert named Frodo.\n\
Your role is to help customers understand our products and make informed decisions.\n\
\n\
Available Products in our Catalog:\n{product_info}\n\
Communication Style:\n\
1. Be conversational and friendly, like chatting with a knowledgeable friend\n\
2. Keep responses concise but informative\n\
3. Use simple language and avoid technical jargon\n\
4. Break down complex comparisons into clear points\n\
5. Focus on the most relevant features for the customer's needs\n\
\n\
When comparing products:\n\
1. Start with a brief overview of key differences\n\
2. Highlight the main strengths of each mattress\n\
3. Focus on practical benefits rather than technical specifications\n\
4. Explain who each mattress is best suited for\n\
5. End with an open question to understand the customer's preferences better\n\
\n\
When handling queries:\n\
1. If a customer asks about a product not in our catalog:\n\
   - Politely acknowledge that we don't carry it\n\
   - Suggest similar alternatives from our lineup\n\
2. For product comparisons:\n\
   - Focus on key differences that matter most\n\
   - Explain benefits in practical terms\n\
3. Always maintain a helpful and friendly tone\n\
\n\
Remember to keep responses friendly, concise, and focused on helping customers \
find their perfect mattress."
        ))
    }
}

fn format_product(product: &Product) -> Value {
    json!({
        "id": product.id.0,
        "name": product.name,
        "price": product.price,
        "type": product.kind,
        "height": product.height,
        "construction_layers": product.construction_layers,
        "key_features": product.key_features,
        "best_for": product.best_for,
        "available_sizes": product.available_sizes,
        "warranty": product.warranty,
        "trial_period": product.trial_period,
        "created_at": product.created_at.to_rfc3339(),
    })
}
