mod api_automation;
mod engine_flows;
