mod caldav;
