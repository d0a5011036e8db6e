/// quick start - originate a loan, pay two months and print where it stands
use loan_ledger_rs::{
    CustomerRef, InMemoryRepository, LoanApplication, LoanService, Money, NewCustomer, NewEmployee,
    Rate, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    loan_ledger_rs::init();

    let service = LoanService::with_defaults(InMemoryRepository::new());
    let time = SafeTimeProvider::new(TimeSource::System);

    let admin = service.bootstrap_superuser(
        NewEmployee {
            username: "admin".to_string(),
            first_name: "Gulnara".to_string(),
            last_name: "Ismailova".to_string(),
            phone: "+996 555 100 200".to_string(),
        },
        &time,
    )?;

    // 10,000 at 10% over 10 months
    let loan = service.create_loan(
        admin.id,
        CustomerRef::New(NewCustomer {
            full_name: "Aizada Bekova".to_string(),
            phone: "+996 700 000 000".to_string(),
            passport_number: "ID1234567".to_string(),
            address: "Bishkek, Chui 120".to_string(),
        }),
        &LoanApplication::new(Money::from_major(10_000))
            .rate(Rate::from_percentage(10))
            .months(10),
        &time,
    )?;

    for entry in service.schedule(loan.id)?.iter().take(2) {
        service.pay_entry(entry.id, &time)?;
    }

    println!("{}", service.loan_detail(loan.id)?.to_json_pretty()?);
    println!("{}", service.dashboard(admin.id)?.to_json_pretty()?);

    Ok(())
}
