use serde::{Deserialize, Serialize};

/// Amount shown on the simulated checkout screen.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct PaymentQuote {
    pub amount_minor: u64,
    pub currency: String,
    pub display_amount: String,
    pub note: String,
}

impl Default for PaymentQuote {
    fn default() -> Self {
        Self {
            amount_minor: 14_900,
            currency: "INR".to_string(),
            display_amount: "₹149.00".to_string(),
            note: "This is a simulated payment screen (Razorpay/Stripe mock).".to_string(),
        }
    }
}

/// Simulated payment gate. No money moves; the user's acknowledgement is the
/// only signal.
#[derive(Clone, Debug, Default)]
pub struct PaymentStep {
    quote: PaymentQuote,
}

impl PaymentStep {
    pub fn quote(&self) -> &PaymentQuote {
        &self.quote
    }

    pub fn confirm(&self, acknowledged: bool) -> bool {
        if acknowledged {
            tracing::info!("Simulated payment of {} accepted", self.quote.display_amount);
        }
        acknowledged
    }
}
