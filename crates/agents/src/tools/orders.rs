use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use snoozy_core::domain::order::{Order, OrderId, PaymentMethod};
use snoozy_core::domain::product::{MattressSize, ProductId};
use snoozy_db::repositories::{OrderRepository, ProductRepository};

use super::{parse_args, ToolError};
use crate::llm::ToolSpec;

pub const DELIVERY_ESTIMATE: &str = "5-7 business days";

/// Order specialty: placing orders and checking order status.
pub struct OrderTools {
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
}

#[derive(Debug, Deserialize)]
struct CreateOrderArgs {
    product_id: String,
    size: MattressSize,
    delivery_address: String,
    payment_method: PaymentMethod,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct GetOrderStatusArgs {
    order_id: String,
}

impl OrderTools {
    pub fn new(products: Arc<dyn ProductRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { products, orders }
    }

    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "create_order",
                description: "Create a new order for a product",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "ID of the product being ordered"
                        },
                        "size": {
                            "type": "string",
                            "description": "Size of the mattress",
                            "enum": ["Twin", "Twin XL", "Full", "Queen", "King", "California King", "Split King"]
                        },
                        "quantity": {
                            "type": "integer",
                            "description": "Number of items to order",
                            "default": 1
                        },
                        "delivery_address": {
                            "type": "string",
                            "description": "Customer's delivery address"
                        },
                        "payment_method": {
                            "type": "string",
                            "description": "Customer's payment method",
                            "enum": ["credit_card", "debit_card", "paypal"]
                        }
                    },
                    "required": ["product_id", "size", "delivery_address", "payment_method"]
                }),
            },
            ToolSpec {
                name: "get_order_status",
                description: "Get status information for an order",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "order_id": {
                            "type": "string",
                            "description": "ID of the order to check"
                        }
                    },
                    "required": ["order_id"]
                }),
            },
        ]
    }

    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        match name {
            "create_order" => {
                let args: CreateOrderArgs = parse_args("create_order", arguments)?;
                self.create_order(args).await
            }
            "get_order_status" => {
                let args: GetOrderStatusArgs = parse_args("get_order_status", arguments)?;
                self.get_order_status(&args.order_id).await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn create_order(&self, args: CreateOrderArgs) -> Result<Value, ToolError> {
        info!(
            event_name = "tools.orders.create",
            product_id = args.product_id.as_str(),
            size = %args.size,
            quantity = args.quantity,
            "creating order"
        );

        let product = self
            .products
            .find_by_id(&ProductId(args.product_id.clone()))
            .await?
            .ok_or_else(|| ToolError::ProductNotFound(args.product_id.clone()))?;

        let order = Order::place(
            &product,
            args.size,
            args.quantity,
            args.delivery_address,
            args.payment_method,
            Utc::now(),
        )?;
        self.orders.insert(order.clone()).await?;

        info!(
            event_name = "tools.orders.created",
            order_id = %order.order_id,
            total = %order.total,
            "order created"
        );

        Ok(json!({
            "success": true,
            "order_id": order.order_id.0,
            "total": order.total,
            "status": order.status.as_str(),
            "delivery_address": order.delivery_address,
            "payment_method": order.payment_method.as_str(),
            "estimated_delivery": DELIVERY_ESTIMATE,
        }))
    }

    async fn get_order_status(&self, order_id: &str) -> Result<Value, ToolError> {
        debug!(event_name = "tools.orders.status", order_id, "checking order status");

        let order = self
            .orders
            .find_by_order_id(&OrderId(order_id.to_string()))
            .await?
            .ok_or_else(|| ToolError::OrderNotFound(order_id.to_string()))?;

        Ok(json!({
            "order_id": order.order_id.0,
            "product": order.product_name,
            "size": order.size,
            "quantity": order.quantity,
            "total": order.total,
            "status": order.status.as_str(),
            "created_at": order.created_at.to_rfc3339(),
            "estimated_delivery": DELIVERY_ESTIMATE,
        }))
    }

    pub async fn system_prompt(&self) -> Result<String, ToolError> {
        let products = self.products.list_all().await?;

        let mut product_info = String::new();
        for product in &products {
            let sizes = product
                .available_sizes
                .iter()
                .map(|size| size.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = write!(
                product_info,
                "\nProduct: {}\nID: {}\nPrice: ${}\nAvailable Sizes: {}\n",
                product.name, product.id, product.price, sizes,
            );
        }

        Ok(format!(
            "You are Frodo, a friendly and efficient order specialist.\n\
Your role is to help customers place orders for mattresses and check order status.\n\
\n\
Available Products:\n{product_info}\n\
Your responsibilities:\n\
1. Order Creation Process:\n\
   a. Initial Order Intent:\n\
      - Confirm product and size selection\n\
      - Provide pricing information\n\
   b. Collect Information:\n\
      - Ask for delivery address\n\
      - Ask for payment method (credit card, debit card, or PayPal)\n\
   c. Complete Order:\n\
      - Create order with order ID\n\
      - Provide order confirmation with delivery estimate\n\
\n\
2. Order Status:\n\
   - Check and provide order status\n\
   - Provide estimated delivery dates\n\
   - Answer basic shipping questions\n\
\n\
Communication Style:\n\
- Be friendly and efficient\n\
- Keep responses concise\n\
- Confirm details clearly\n\
- Guide customer through each step\n\
\n\
Remember to:\n\
1. Always confirm the product and size\n\
2. Provide clear pricing information\n\
3. Ask for delivery address\n\
4. Ask for payment method\n\
5. Give delivery estimates ({DELIVERY_ESTIMATE})"
        ))
    }
}
