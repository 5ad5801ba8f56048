use sales_report::types::Result;
use sales_report::SalesReportApp;

fn main() -> Result<()> {
    SalesReportApp::run().inspect_err(|err| {
        eprintln!("Application errored out: {err}");
    })
}
