mod accrual;
mod helpers;
mod mart;
