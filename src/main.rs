use tabula::driver;
use tabula_utils::TabulaResult;

fn main() -> TabulaResult<()> {
    driver::run_tabula()
}
