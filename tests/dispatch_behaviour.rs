//! Behavioural scenarios for the scenario context.

mod dispatch;
