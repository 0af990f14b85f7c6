
#[cfg(test)]
mod trigger_tests;

#[cfg(test)]
mod webhook_tests;


#[cfg(test)]
mod failure_tests;

#[cfg(test)]
mod lock_tests;
